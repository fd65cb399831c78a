//! Reading, merging and persisting `.graphqlconfig` project configuration.
//! The file is JSON, or YAML when named `.graphqlconfig.yaml`/`.graphqlconfig.yml`.
use crate::cli::{similar_help_suggestions, PrintableMessage, RuntimeConfig};
use crate::fragments::Dialect;
use crate::work::Job;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Looked for in this order in every directory from the working one upwards.
const DISCOVERABLE_FILE_NAMES: [&str; 3] =
    [".graphqlconfig", ".graphqlconfig.yaml", ".graphqlconfig.yml"];
const EXTENSION_KEY: &str = "generate-fragments";
const LEGACY_EXTENSION_KEY: &str = "fragments";
const DEFAULT_PROJECT_NAME: &str = "default";

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
struct GenerateFragmentsExtension {
    output: Option<String>,
    generator: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct BundleExtension {
    output: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct Extensions {
    #[serde(rename = "generate-fragments")]
    generate_fragments: Option<GenerateFragmentsExtension>,
    fragments: Option<Value>,
    #[serde(rename = "prepare-bundle")]
    prepare_bundle: Option<BundleExtension>,
    bundle: Option<BundleExtension>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct ProjectConfig {
    schema_path: Option<String>,
    #[serde(default)]
    extensions: Extensions,
}

impl ProjectConfig {
    fn has_fragments_extension(&self) -> bool {
        self.extensions.generate_fragments.is_some() || self.extensions.fragments.is_some()
    }

    fn configured_generator(&self) -> Option<&str> {
        self.extensions
            .generate_fragments
            .as_ref()
            .and_then(|ext| ext.generator.as_deref())
    }

    fn configured_output(&self) -> Option<&str> {
        self.extensions
            .generate_fragments
            .as_ref()
            .and_then(|ext| ext.output.as_deref())
    }

    fn bundle_output(&self) -> Option<&str> {
        self.extensions
            .prepare_bundle
            .as_ref()
            .and_then(|bundle| bundle.output.as_deref())
    }

    fn legacy_bundle_output(&self) -> Option<&str> {
        self.extensions
            .bundle
            .as_ref()
            .and_then(|bundle| bundle.output.as_deref())
    }
}

/// Settings a successful compile hands back to be merged into the project's
/// `generate-fragments` extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorSettings {
    pub output: String,
    pub generator: String,
}

/// What to do with one project of the config file.
#[derive(Debug)]
pub enum ProjectPlan {
    Compile(Job),
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(OsStr::to_str) {
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Json,
        }
    }
}

/// The first config file found in `start` or one of its ancestors.
fn discover(start: &Path) -> Result<PathBuf, PrintableMessage> {
    start
        .ancestors()
        .flat_map(|directory| {
            DISCOVERABLE_FILE_NAMES
                .into_iter()
                .map(move |file_name| directory.join(file_name))
        })
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| {
            let mut message = PrintableMessage::new_simple_program_error(&format!(
                "no config file found in `{}` or any parent directory",
                start.display()
            ));
            message.with_help_text(&format!(
                "Create one of {} or pass its path with `--config`.",
                DISCOVERABLE_FILE_NAMES
                    .iter()
                    .map(|file_name| format!("`{file_name}`"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
            message
        })
}

/// The parsed config file, kept as a raw JSON map so a save preserves unknown
/// keys and their order.
#[derive(Debug)]
pub struct GraphQLConfig {
    path: PathBuf,
    format: ConfigFormat,
    raw: Map<String, Value>,
}

impl GraphQLConfig {
    /// The path given on the command line, or the nearest discoverable config
    /// file above the working directory.
    pub fn resolve_path(explicit_path: Option<&Path>) -> Result<PathBuf, PrintableMessage> {
        if let Some(path) = explicit_path {
            return Ok(path.to_path_buf());
        }
        let working_directory = std::env::current_dir().map_err(|io_error| {
            PrintableMessage::new_simple_program_error(&format!(
                "could not determine the working directory: {io_error}"
            ))
        })?;
        discover(&working_directory)
    }

    pub fn from_path(path: &Path) -> Result<Self, PrintableMessage> {
        let contents = std::fs::read_to_string(path)
            .map_err(|io_error| PrintableMessage::new_compile_error_from_read_io_error(&io_error, path))?;
        Self::from_contents(path, &contents)
    }

    fn from_contents(path: &Path, contents: &str) -> Result<Self, PrintableMessage> {
        let format = ConfigFormat::from_path(path);
        let raw = match format {
            ConfigFormat::Json => serde_json::from_str::<Map<String, Value>>(contents)
                .map_err(|error| config_error(path, &error.to_string()))?,
            ConfigFormat::Yaml => serde_yaml::from_str::<Map<String, Value>>(contents)
                .map_err(|error| config_error(path, &error.to_string()))?,
        };
        Ok(GraphQLConfig {
            path: path.to_path_buf(),
            format,
            raw,
        })
    }

    pub fn file_path(&self) -> &Path {
        &self.path
    }

    fn directory(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn is_single_project(&self) -> bool {
        !self.raw.contains_key("projects") && self.raw.contains_key("schemaPath")
    }

    /// Project names in file order.
    pub fn project_names(&self) -> Result<Vec<String>, PrintableMessage> {
        if self.is_single_project() {
            return Ok(vec![DEFAULT_PROJECT_NAME.to_string()]);
        }
        match self.raw.get("projects") {
            Some(Value::Object(projects)) if !projects.is_empty() => {
                Ok(projects.keys().cloned().collect())
            }
            Some(Value::Object(_)) | None => Err(config_error(
                &self.path,
                "No projects defined in config file",
            )),
            Some(_) => Err(config_error(&self.path, "`projects` must be an object")),
        }
    }

    fn raw_project(&self, name: &str) -> Option<&Map<String, Value>> {
        if self.is_single_project() {
            return (name == DEFAULT_PROJECT_NAME).then_some(&self.raw);
        }
        self.raw
            .get("projects")
            .and_then(Value::as_object)
            .and_then(|projects| projects.get(name))
            .and_then(Value::as_object)
    }

    fn raw_project_mut(&mut self, name: &str) -> Option<&mut Map<String, Value>> {
        if self.is_single_project() {
            return (name == DEFAULT_PROJECT_NAME).then_some(&mut self.raw);
        }
        self.raw
            .get_mut("projects")
            .and_then(Value::as_object_mut)
            .and_then(|projects| projects.get_mut(name))
            .and_then(Value::as_object_mut)
    }

    fn project(&self, name: &str) -> Result<ProjectConfig, PrintableMessage> {
        let raw = self.raw_project(name).ok_or_else(|| {
            config_error(&self.path, &format!("project `{name}` must be an object"))
        })?;
        serde_json::from_value(Value::Object(raw.clone())).map_err(|error| {
            config_error(&self.path, &format!("in project `{name}`: {error}"))
        })
    }

    /// The names of the projects to process: the ones given on the command line,
    /// or every project in the file.
    pub fn select_projects(
        &self,
        runtime_config: &RuntimeConfig,
    ) -> Result<Vec<String>, PrintableMessage> {
        let known = self.project_names()?;
        let requested = runtime_config.selected_projects();
        if requested.is_empty() {
            return Ok(known);
        }
        let mut selected = Vec::with_capacity(requested.len());
        for name in requested {
            if !known.contains(name) {
                let mut message =
                    config_error(&self.path, &format!("unknown project `{name}`"));
                let extra = similar_help_suggestions(name, known.iter().cloned())
                    .unwrap_or_default();
                message.with_help_text(&format!(
                    "Check the projects defined in the config file.{extra}"
                ));
                return Err(message);
            }
            if !selected.contains(name) {
                selected.push(name.clone());
            }
        }
        Ok(selected)
    }

    /// Decide generator, output and input schema for one project.
    pub fn plan_project(
        &self,
        name: &str,
        runtime_config: &RuntimeConfig,
    ) -> Result<ProjectPlan, PrintableMessage> {
        let project = self.project(name)?;
        let explicitly_requested = !runtime_config.selected_projects().is_empty();
        if !explicitly_requested && !project.has_fragments_extension() {
            return Ok(ProjectPlan::Skip);
        }
        let generator = determine_generator(runtime_config, &project)?;
        let dialect = Dialect::from_generator(&generator);
        let (output_path, output_setting) =
            self.determine_output_path(name, runtime_config, &project, dialect)?;
        let schema_path = self.determine_input_schema(&project)?;
        Ok(ProjectPlan::Compile(Job {
            project_name: name.to_string(),
            schema_path,
            output_path,
            dialect,
            settings: GeneratorSettings {
                output: output_setting,
                generator,
            },
        }))
    }

    /// Returns the path to write to, and the value to persist as the output setting.
    fn determine_output_path(
        &self,
        name: &str,
        runtime_config: &RuntimeConfig,
        project: &ProjectConfig,
        dialect: Dialect,
    ) -> Result<(PathBuf, String), PrintableMessage> {
        if let Some(output_dir) = runtime_config.output_dir() {
            let path = output_dir.join(format!("{name}.fragments.{}", dialect.extension()));
            let setting = relative_to(&self.directory(), &path)
                .unwrap_or_else(|| path.clone())
                .to_string_lossy()
                .into_owned();
            return Ok((path, setting));
        }
        match project.configured_output() {
            Some(output) => Ok((self.directory().join(output), output.to_string())),
            None => Err(config_error(
                &self.path,
                "Output path cannot be determined. No existing configuration found and no output parameter specified.",
            )),
        }
    }

    fn determine_input_schema(&self, project: &ProjectConfig) -> Result<PathBuf, PrintableMessage> {
        let bundle_defined = project.bundle_output().is_some();
        let schema_path = project
            .bundle_output()
            .or_else(|| project.legacy_bundle_output())
            .or(project.schema_path.as_deref())
            .ok_or_else(|| config_error(&self.path, "Input schema cannot be determined."))?;
        let full_path = self.directory().join(schema_path);
        if full_path.is_file() {
            return Ok(full_path);
        }
        let hint = if bundle_defined {
            " Did you run bundle first?"
        } else {
            ""
        };
        Err(config_error(
            &self.path,
            &format!("Schema '{}' not found.{hint}", full_path.display()),
        ))
    }

    /// Merge returned settings into a project's `generate-fragments` extension.
    pub fn apply_settings(&mut self, name: &str, settings: &GeneratorSettings) {
        let project = match self.raw_project_mut(name) {
            Some(project) => project,
            None => return,
        };
        let extensions = project
            .entry("extensions")
            .or_insert_with(|| Value::Object(Map::new()));
        if !extensions.is_object() {
            *extensions = Value::Object(Map::new());
        }
        if let Value::Object(extensions) = extensions {
            extensions.remove(LEGACY_EXTENSION_KEY);
            let fragments_ext = extensions
                .entry(EXTENSION_KEY)
                .or_insert_with(|| Value::Object(Map::new()));
            if !fragments_ext.is_object() {
                *fragments_ext = Value::Object(Map::new());
            }
            if let Value::Object(fragments_ext) = fragments_ext {
                fragments_ext.insert("output".to_string(), Value::from(settings.output.as_str()));
                fragments_ext.insert(
                    "generator".to_string(),
                    Value::from(settings.generator.as_str()),
                );
            }
        }
    }

    /// Serializes in the format the file was read in.
    fn to_config_string(&self) -> Result<String, PrintableMessage> {
        let serialized = match self.format {
            ConfigFormat::Json => serde_json::to_string_pretty(&self.raw)
                .map_err(|error| config_error(&self.path, &error.to_string()))?,
            ConfigFormat::Yaml => serde_yaml::to_string(&self.raw)
                .map_err(|error| config_error(&self.path, &error.to_string()))?,
        };
        if serialized.ends_with('\n') {
            Ok(serialized)
        } else {
            Ok(format!("{serialized}\n"))
        }
    }

    pub fn save(&self) -> Result<(), PrintableMessage> {
        let contents = self.to_config_string()?;
        std::fs::write(&self.path, contents).map_err(|io_error| {
            PrintableMessage::new_compile_error_from_write_io_error(&io_error, &self.path)
        })
    }
}

fn config_error(path: &Path, detail: &str) -> PrintableMessage {
    PrintableMessage::new_simple_program_error(&format!(
        "error in config file `{}`: {detail}",
        path.display()
    ))
}

fn determine_generator(
    runtime_config: &RuntimeConfig,
    project: &ProjectConfig,
) -> Result<String, PrintableMessage> {
    runtime_config
        .generator()
        .or_else(|| project.configured_generator())
        .map(str::to_string)
        .ok_or_else(|| {
            PrintableMessage::new_simple_compile_error(
                "Generator cannot be determined. No existing configuration found and no generator parameter specified.",
            )
        })
}

/// Express `path` relative to `base` when it lies beneath it.
fn relative_to(base: &Path, path: &Path) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    let absolute_base = normalize(&cwd.join(base));
    let absolute_path = normalize(&cwd.join(path));
    absolute_path
        .strip_prefix(&absolute_base)
        .ok()
        .map(Path::to_path_buf)
}

fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
