use crate::cli::PrintableMessage;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

pub mod import;
pub mod schema;

pub fn read_graphql_file(path: &Path) -> Result<String, PrintableMessage> {
    File::open(path)
        .and_then(|file| {
            let mut buf_reader = BufReader::new(file);
            let mut contents = String::new();
            buf_reader.read_to_string(&mut contents)?;
            Ok(contents)
        })
        .map_err(|io_error| PrintableMessage::new_compile_error_from_read_io_error(&io_error, path))
}
