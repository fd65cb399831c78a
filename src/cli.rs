use clap::Parser;
use colored::Colorize;
use graphql_parser::Pos;
use std::convert::TryFrom;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "gqlfrag",
    version,
    author,
    about = "\nGraphQL Fragment generator (gqlfrag) derives reusable fragments for every object type of a schema."
)]
struct Cli {
    /// Path of the project configuration file. Without it, `.graphqlconfig`,
    /// `.graphqlconfig.yaml` or `.graphqlconfig.yml` is searched for in the
    /// working directory and its parents
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config_path: Option<PathBuf>,

    /// Only generate fragments for the named project (may be repeated)
    #[arg(short = 'p', long = "project", value_name = "NAME")]
    projects: Vec<String>,

    /// Output folder, fragments are written to DIR/<project>.fragments.<ext>
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Generate to `js` or `graphql`
    #[arg(short = 'g', long = "generator", value_name = "GENERATOR")]
    generator: Option<String>,

    /// Save settings to config file
    #[arg(short = 's', long = "save")]
    save: bool,

    /// Show verbose output messages
    #[arg(long = "verbose")]
    verbose: bool,

    /// Sets the number of threads (defaults to number of CPU cores)
    #[arg(long = "num-threads", value_name = "NUMBER")]
    number_threads: Option<u8>,
}

/// User configured runtime configuration
#[derive(Debug)]
pub struct RuntimeConfig {
    config_path: Option<PathBuf>,
    projects: Vec<String>,
    output_dir: Option<PathBuf>,
    generator: Option<String>,
    save: bool,
    verbose: bool,
    number_threads: u8,
}

impl RuntimeConfig {
    pub fn from_cli() -> Self {
        let cli = Cli::parse();
        RuntimeConfig {
            config_path: cli.config_path,
            projects: cli.projects,
            output_dir: cli.output_dir,
            generator: cli.generator,
            save: cli.save,
            verbose: cli.verbose,
            number_threads: cli
                .number_threads
                .filter(|count| *count > 0)
                .or_else(|| u8::try_from(num_cpus::get()).ok())
                .unwrap_or(4),
        }
    }

    pub fn config_file_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn selected_projects(&self) -> &[String] {
        &self.projects
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    pub fn generator(&self) -> Option<&str> {
        self.generator.as_deref()
    }

    pub fn should_save(&self) -> bool {
        self.save
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn thread_count(&self) -> u8 {
        self.number_threads
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageLevel {
    Error,
    ProgramError,
    Warning,
    Info,
    Success,
}

impl MessageLevel {
    fn is_failure(&self) -> bool {
        matches!(self, MessageLevel::Error | MessageLevel::ProgramError)
    }

    fn colored_label(&self) -> colored::ColoredString {
        match self {
            MessageLevel::Error => "error".red().bold(),
            MessageLevel::ProgramError => "program error".red().bold(),
            MessageLevel::Warning => "warning".yellow().bold(),
            MessageLevel::Info => "info".cyan().bold(),
            MessageLevel::Success => "success".green().bold(),
        }
    }
}

/// A single line of source text, pointed at by a message.
#[derive(Debug)]
pub struct LocationInformation {
    line_number: usize,
    column: usize,
    line: String,
    help_text: Option<String>,
}

impl LocationInformation {
    /// `line_number` and `column` are one based.
    pub fn new_from_line_and_column(line_number: usize, line: &str, column: usize) -> Self {
        LocationInformation {
            line_number,
            column,
            line: line.to_string(),
            help_text: None,
        }
    }

    pub fn new_from_contents_and_position(contents: &str, position: &Pos) -> Self {
        let line = contents
            .lines()
            .nth(position.line.saturating_sub(1))
            .unwrap_or("");
        Self::new_from_line_and_column(position.line, line, position.column)
    }

    pub fn with_help_text(&mut self, help_text: &str) -> &mut Self {
        self.help_text = Some(help_text.to_string());
        self
    }
}

#[derive(Debug)]
struct SourceInformation {
    file_path: PathBuf,
    location: Option<LocationInformation>,
}

/// Anything the user should read: errors, warnings and status lines.
#[derive(Debug)]
pub struct PrintableMessage {
    level: MessageLevel,
    title: String,
    source: Option<SourceInformation>,
    help_text: Option<String>,
}

impl PrintableMessage {
    fn new(level: MessageLevel, title: &str) -> Self {
        PrintableMessage {
            level,
            title: title.to_string(),
            source: None,
            help_text: None,
        }
    }

    pub fn new_simple_compile_error(title: &str) -> Self {
        Self::new(MessageLevel::Error, title)
    }

    pub fn new_simple_program_error(title: &str) -> Self {
        Self::new(MessageLevel::ProgramError, title)
    }

    pub fn new_compile_error(
        title: &str,
        file_path: &Path,
        contents: &str,
        position: &Pos,
        help_text: Option<&str>,
    ) -> Self {
        let mut message = Self::new_simple_compile_error(title);
        let mut location = LocationInformation::new_from_contents_and_position(contents, position);
        if let Some(help_text) = help_text {
            location.with_help_text(help_text);
        }
        message.with_source_information(file_path, Some(location));
        message
    }

    pub fn new_compile_error_from_read_io_error(error: &std::io::Error, path: &Path) -> Self {
        Self::new_simple_compile_error(&format!("could not read `{}`: {error}", path.display()))
    }

    pub fn new_compile_error_from_write_io_error(error: &std::io::Error, path: &Path) -> Self {
        Self::new_simple_compile_error(&format!("could not write `{}`: {error}", path.display()))
    }

    pub fn new_warning(title: &str) -> Self {
        Self::new(MessageLevel::Warning, title)
    }

    pub fn new_info(title: &str) -> Self {
        Self::new(MessageLevel::Info, title)
    }

    pub fn new_success(title: &str) -> Self {
        Self::new(MessageLevel::Success, title)
    }

    pub fn with_source_information(
        &mut self,
        file_path: &Path,
        location: Option<LocationInformation>,
    ) -> &mut Self {
        self.source = Some(SourceInformation {
            file_path: file_path.to_path_buf(),
            location,
        });
        self
    }

    pub fn with_help_text(&mut self, help_text: &str) -> &mut Self {
        self.help_text = Some(help_text.to_string());
        self
    }

    pub fn is_failure(&self) -> bool {
        self.level.is_failure()
    }
}

impl fmt::Display for PrintableMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.level.colored_label(), self.title.bold())?;
        let source = match &self.source {
            Some(source) => source,
            None => {
                if let Some(help_text) = &self.help_text {
                    write!(f, "\n  {} {help_text}", "= help:".bold())?;
                }
                return Ok(());
            }
        };
        let location = match &source.location {
            Some(location) => location,
            None => {
                write!(f, "\n {} {}", "-->".blue().bold(), source.file_path.display())?;
                if let Some(help_text) = &self.help_text {
                    write!(f, "\n  {} {help_text}", "= help:".bold())?;
                }
                return Ok(());
            }
        };
        let gutter = " ".repeat(location.line_number.to_string().len() + 1);
        write!(
            f,
            "\n{}{} {}:{}:{}",
            &gutter[1..],
            "-->".blue().bold(),
            source.file_path.display(),
            location.line_number,
            location.column,
        )?;
        write!(f, "\n{gutter}{}", "|".blue().bold())?;
        write!(
            f,
            "\n{} {} {}",
            location.line_number.to_string().blue().bold(),
            "|".blue().bold(),
            location.line,
        )?;
        write!(
            f,
            "\n{gutter}{} {}{}",
            "|".blue().bold(),
            " ".repeat(location.column.saturating_sub(1)),
            "^".red().bold(),
        )?;
        let help_text = location.help_text.as_ref().or(self.help_text.as_ref());
        if let Some(help_text) = help_text {
            write!(f, "\n{gutter}{} {help_text}", "= help:".bold())?;
        }
        Ok(())
    }
}

/// Suggest names close to `name`, formatted to be appended to a help sentence.
pub fn similar_help_suggestions(
    name: &str,
    possible_names: impl Iterator<Item = String>,
) -> Option<String> {
    let mut scored = possible_names
        .map(|possible| (strsim::jaro_winkler(name, &possible), possible))
        .filter(|(score, _)| *score > 0.8)
        .collect::<Vec<_>>();
    scored.sort_by(|(a_score, a_name), (b_score, b_name)| {
        b_score
            .partial_cmp(a_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a_name.cmp(b_name))
    });
    let names = scored
        .into_iter()
        .take(3)
        .map(|(_, possible)| format!("`{possible}`"))
        .collect::<Vec<_>>();
    match names.len() {
        0 => None,
        1 => Some(format!(" Did you mean {}?", names[0])),
        _ => Some(format!(" Did you mean one of {}?", names.join(", "))),
    }
}

/// Prints messages in order, returning true if any of them is a failure.
pub fn print_messages<'a>(messages: impl IntoIterator<Item = &'a PrintableMessage>) -> bool {
    let mut had_failure = false;
    for message in messages {
        had_failure |= message.is_failure();
        println!("{message}");
    }
    had_failure
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_close_names_only() {
        let names = vec!["frontend".to_string(), "backend".to_string(), "zzz".to_string()];
        assert_eq!(
            similar_help_suggestions("fronted", names.into_iter()),
            Some(" Did you mean `frontend`?".to_string())
        );
        assert_eq!(
            similar_help_suggestions("qqqq", vec!["frontend".to_string()].into_iter()),
            None
        );
    }

    #[test]
    fn location_from_position_picks_line() {
        let contents = "type A {\n  id: ID\n}\n";
        let location = LocationInformation::new_from_contents_and_position(
            contents,
            &Pos { line: 2, column: 3 },
        );
        assert_eq!(location.line, "  id: ID");
        assert_eq!(location.column, 3);
    }

    #[test]
    fn failure_levels() {
        assert!(PrintableMessage::new_simple_compile_error("x").is_failure());
        assert!(PrintableMessage::new_simple_program_error("x").is_failure());
        assert!(!PrintableMessage::new_warning("x").is_failure());
        assert!(!PrintableMessage::new_success("x").is_failure());
    }
}
