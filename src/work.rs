use crate::cli::PrintableMessage;
use crate::config::GeneratorSettings;
use crate::fragments::{self, Dialect};
use crate::graphql::import::load_schema_source;
use std::path::PathBuf;

/// One project's compile: everything needed to go from schema file to
/// fragments file without looking at the config again.
#[derive(Debug)]
pub struct Job {
    pub project_name: String,
    pub schema_path: PathBuf,
    pub output_path: PathBuf,
    pub dialect: Dialect,
    pub settings: GeneratorSettings,
}

#[derive(Debug)]
pub struct JobOutput {
    /// The settings to merge back into the config.
    pub settings: GeneratorSettings,
    pub fragment_count: usize,
}

#[derive(Debug)]
pub struct JobReport {
    pub project_name: String,
    pub output_path: PathBuf,
    pub result: Result<JobOutput, Vec<PrintableMessage>>,
}

impl Job {
    /// Returns the number of object types fragments were generated for.
    fn compile_and_write(&self) -> Result<usize, Vec<PrintableMessage>> {
        let source = load_schema_source(&self.schema_path)?;
        let compiled = fragments::compile(source.contents(), self.dialect)
            .map_err(|error| vec![PrintableMessage::from((&source, error))])?;
        if let Some(parent) = self.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|io_error| {
                    vec![PrintableMessage::new_compile_error_from_write_io_error(
                        &io_error, parent,
                    )]
                })?;
            }
        }
        std::fs::write(&self.output_path, compiled.contents).map_err(|io_error| {
            vec![PrintableMessage::new_compile_error_from_write_io_error(
                &io_error,
                &self.output_path,
            )]
        })?;
        Ok(compiled.fragments.standard.len())
    }

    pub fn run(self) -> JobReport {
        let result = self
            .compile_and_write()
            .map(|fragment_count| JobOutput {
                settings: self.settings.clone(),
                fragment_count,
            });
        JobReport {
            project_name: self.project_name,
            output_path: self.output_path,
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn job(schema_path: &Path, output_path: &Path) -> Job {
        Job {
            project_name: "app".to_string(),
            schema_path: schema_path.to_path_buf(),
            output_path: output_path.to_path_buf(),
            dialect: Dialect::GraphQL,
            settings: GeneratorSettings {
                output: "app.fragments.graphql".to_string(),
                generator: "graphql".to_string(),
            },
        }
    }

    #[test]
    fn writes_fragments_and_counts_types() {
        let temp_dir = assert_fs::TempDir::new().unwrap();
        let schema_path = temp_dir.path().join("schema.graphql");
        std::fs::write(&schema_path, "type Query { tag: Tag } type Tag { id: ID }").unwrap();
        let output_path = temp_dir.path().join("nested/out.graphql");

        let report = job(&schema_path, &output_path).run();
        let output = report.result.unwrap();
        assert_eq!(output.fragment_count, 1);
        assert_eq!(output.settings.generator, "graphql");
        let written = std::fs::read_to_string(&output_path).unwrap();
        assert!(written.contains("fragment TagDeepNesting on Tag {"));
    }

    #[test]
    fn missing_schema_reports_read_error() {
        let report = job(
            Path::new("definitely/not/here.graphql"),
            Path::new("unused.graphql"),
        )
        .run();
        let errors = report.result.unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("could not read"));
    }
}
