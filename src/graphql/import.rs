//! Resolution of `# import` directives so a schema split over several files
//! becomes one self-contained document.
//!
//! A directive names the definitions it wants from another file:
//!
//! ```graphql
//! # import * from "everything.graphql"
//! # import Author, Book.title from "books.graphql"
//! #import "everything-too.graphql"
//! ```
//!
//! Named types are looked up in the imported file and the files it imports.
//! Their dependencies come along. Root operation types found in several files
//! are merged field by field.
use super::read_graphql_file;
use super::schema::{
    referenced_type_names, type_definition_header, Error as SchemaError, BUILT_IN_SCALARS,
};
use crate::cli::{LocationInformation, PrintableMessage};
use graphql_parser::schema::{Definition, Document, ObjectType, TypeDefinition};
use graphql_parser::Pos;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

const IMPORT_KEYWORD: &str = "import";
const FROM_KEYWORD: &str = "from";
const WILDCARD: &str = "*";
const DEFAULT_ROOT_TYPE_NAMES: [&str; 3] = ["Query", "Mutation", "Subscription"];

/// Fields kept from an imported type.
#[derive(Debug, Clone, PartialEq)]
enum FieldFilter {
    All,
    Only(Vec<String>),
}

impl FieldFilter {
    fn merge(&mut self, other: FieldFilter) {
        match (self, other) {
            (FieldFilter::All, _) => {}
            (this, FieldFilter::All) => *this = FieldFilter::All,
            (FieldFilter::Only(fields), FieldFilter::Only(more)) => {
                for field in more {
                    if !fields.contains(&field) {
                        fields.push(field);
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ImportSelection {
    WholeFile,
    Types(Vec<(String, FieldFilter)>),
}

#[derive(Debug, PartialEq)]
struct ImportDirective<'a> {
    path: &'a str,
    /// One based column where the path starts.
    column: usize,
    selection: ImportSelection,
}

fn parse_selection(names: &str) -> ImportSelection {
    let mut types: Vec<(String, FieldFilter)> = Vec::new();
    for name in names.split(',').map(str::trim).filter(|name| !name.is_empty()) {
        if name == WILDCARD {
            return ImportSelection::WholeFile;
        }
        let (type_name, filter) = match name.split_once('.') {
            Some((type_name, WILDCARD)) => (type_name, FieldFilter::All),
            Some((type_name, field)) => (type_name, FieldFilter::Only(vec![field.to_string()])),
            None => (name, FieldFilter::All),
        };
        match types.iter_mut().find(|(existing, _)| existing == type_name) {
            Some((_, existing)) => existing.merge(filter),
            None => types.push((type_name.to_string(), filter)),
        }
    }
    ImportSelection::Types(types)
}

fn parse_import_line(line: &str) -> Option<ImportDirective<'_>> {
    let rest = line.trim_start().strip_prefix('#')?.trim_start();
    let rest = rest.strip_prefix(IMPORT_KEYWORD)?;
    if !rest.starts_with(|c: char| c.is_whitespace() || c == '"' || c == '\'') {
        return None;
    }
    let open = rest.find(|c: char| c == '"' || c == '\'')?;
    let quote = rest[open..].chars().next()?;
    let close = rest.rfind(quote)?;
    if close <= open + 1 {
        return None;
    }
    let head = rest[..open].trim();
    let selection = if head.is_empty() {
        ImportSelection::WholeFile
    } else {
        parse_selection(head.strip_suffix(FROM_KEYWORD)?)
    };
    Some(ImportDirective {
        path: &rest[open + 1..close],
        column: line.len() - rest.len() + open + 2,
        selection,
    })
}

fn identity_of(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn holds_definitions(contents: &str) -> bool {
    contents.lines().map(str::trim).any(|line| !line.is_empty() && !line.starts_with('#'))
}

fn located_error(
    title: &str,
    file_path: &Path,
    contents: &str,
    position: Option<&Pos>,
    help_text: Option<&str>,
) -> PrintableMessage {
    match position {
        Some(position) => {
            PrintableMessage::new_compile_error(title, file_path, contents, position, help_text)
        }
        None => {
            let mut message = PrintableMessage::new_simple_compile_error(title);
            message.with_source_information(file_path, None);
            if let Some(help_text) = help_text {
                message.with_help_text(help_text);
            }
            message
        }
    }
}

#[derive(Debug)]
struct ResolvedImport {
    /// Index of the imported file.
    target: usize,
    selection: ImportSelection,
    line_number: usize,
    column: usize,
}

#[derive(Debug)]
struct SchemaFile {
    path: PathBuf,
    contents: String,
    definitions: Vec<Definition<'static, String>>,
    imports: Vec<ResolvedImport>,
}

impl SchemaFile {
    fn directive_location(&self, line_number: usize, column: usize) -> LocationInformation {
        let line = self
            .contents
            .lines()
            .nth(line_number.saturating_sub(1))
            .unwrap_or("");
        LocationInformation::new_from_line_and_column(line_number, line, column)
    }

    fn type_definition(&self, name: &str) -> Option<usize> {
        self.definitions.iter().position(|definition| {
            matches!(definition, Definition::TypeDefinition(type_def) if type_definition_header(type_def).0 == name)
        })
    }
}

#[derive(Debug, Default)]
struct Loader {
    files: Vec<SchemaFile>,
    loaded: HashMap<PathBuf, usize>,
    messages: Vec<PrintableMessage>,
}

impl Loader {
    /// Parses `contents` and loads its imports depth first. Returns the index
    /// of the new file.
    fn load(&mut self, path: &Path, contents: String) -> usize {
        let index = self.files.len();
        self.loaded.insert(identity_of(path), index);
        // the parser rejects documents without definitions, such as import-only files
        let parsed = if holds_definitions(&contents) {
            graphql_parser::parse_schema::<String>(&contents).map(Document::into_static)
        } else {
            Ok(Document::default())
        };
        let definitions = match parsed {
            Ok(document) => document.definitions,
            Err(parse_error) => {
                let error = SchemaError::from_parse_error(parse_error);
                self.messages.push(located_error(
                    &error.title(),
                    path,
                    &contents,
                    error.position(),
                    error.help_text(),
                ));
                Vec::new()
            }
        };
        let directives = contents
            .lines()
            .enumerate()
            .filter_map(|(line_index, line)| {
                parse_import_line(line).map(|directive| {
                    (
                        line_index + 1,
                        directive.path.to_string(),
                        directive.column,
                        directive.selection,
                    )
                })
            })
            .collect::<Vec<_>>();
        self.files.push(SchemaFile {
            path: path.to_path_buf(),
            contents,
            definitions,
            imports: Vec::new(),
        });

        let mut current_dir = path.to_path_buf();
        current_dir.pop();
        for (line_number, import_path, column, selection) in directives {
            let import_path = current_dir.join(import_path);
            let known = self.loaded.get(&identity_of(&import_path)).copied();
            let target = match known {
                Some(target) => target,
                None => match read_graphql_file(&import_path) {
                    Ok(imported) => self.load(&import_path, imported),
                    Err(mut message) => {
                        let file = &self.files[index];
                        message.with_source_information(
                            &file.path,
                            Some(file.directive_location(line_number, column)),
                        );
                        self.messages.push(message);
                        continue;
                    }
                },
            };
            self.files[index].imports.push(ResolvedImport {
                target,
                selection,
                line_number,
                column,
            });
        }
        index
    }
}

/// A definition of one of the loaded files that goes into the combined
/// document.
#[derive(Debug)]
struct Selected {
    file: usize,
    definition: usize,
    fields: FieldFilter,
}

fn add_selection(selected: &mut Vec<Selected>, file: usize, definition: usize, fields: FieldFilter) {
    match selected
        .iter_mut()
        .find(|existing| existing.file == file && existing.definition == definition)
    {
        Some(existing) => existing.fields.merge(fields),
        None => selected.push(Selected {
            file,
            definition,
            fields,
        }),
    }
}

/// The root file, plus every file pulled in with `*` by a file that is
/// itself whole.
fn whole_files(files: &[SchemaFile]) -> Vec<bool> {
    let mut whole = vec![false; files.len()];
    let mut pending = vec![0];
    while let Some(index) = pending.pop() {
        if whole[index] {
            continue;
        }
        whole[index] = true;
        pending.extend(
            files[index]
                .imports
                .iter()
                .filter(|import| import.selection == ImportSelection::WholeFile)
                .map(|import| import.target),
        );
    }
    whole
}

/// `start` first, then every file it imports directly or indirectly, in load
/// order.
fn reachable_files(files: &[SchemaFile], start: usize) -> Vec<usize> {
    let mut seen = vec![false; files.len()];
    let mut pending = vec![start];
    while let Some(index) = pending.pop() {
        if seen[index] {
            continue;
        }
        seen[index] = true;
        pending.extend(files[index].imports.iter().map(|import| import.target));
    }
    let mut order = vec![start];
    order.extend((0..files.len()).filter(|index| *index != start && seen[*index]));
    order
}

fn filtered_type(
    definition: &TypeDefinition<'static, String>,
    fields: &FieldFilter,
) -> TypeDefinition<'static, String> {
    let mut definition = definition.clone();
    if let FieldFilter::Only(names) = fields {
        match &mut definition {
            TypeDefinition::Object(object) => {
                object.fields.retain(|field| names.contains(&field.name))
            }
            TypeDefinition::Interface(interface) => {
                interface.fields.retain(|field| names.contains(&field.name))
            }
            _ => {}
        }
    }
    definition
}

fn selected_definition(files: &[SchemaFile], selection: &Selected) -> Definition<'static, String> {
    match &files[selection.file].definitions[selection.definition] {
        Definition::TypeDefinition(type_def) => {
            Definition::TypeDefinition(filtered_type(type_def, &selection.fields))
        }
        other => other.clone(),
    }
}

fn missing_type_error(
    file: &SchemaFile,
    import: &ResolvedImport,
    type_name: &str,
    imported: &Path,
) -> PrintableMessage {
    let mut message = PrintableMessage::new_simple_compile_error(&format!(
        "could not find type `{type_name}` in `{}`",
        imported.display()
    ));
    message.with_source_information(
        &file.path,
        Some(file.directive_location(import.line_number, import.column)),
    );
    message
}

fn select_definitions(files: &[SchemaFile]) -> Result<Vec<Selected>, Vec<PrintableMessage>> {
    let whole = whole_files(files);
    let mut selected = Vec::new();
    for (file_index, file) in files.iter().enumerate().filter(|(index, _)| whole[*index]) {
        for (definition_index, definition) in file.definitions.iter().enumerate() {
            if matches!(
                definition,
                Definition::SchemaDefinition(_) | Definition::TypeDefinition(_)
            ) {
                selected.push(Selected {
                    file: file_index,
                    definition: definition_index,
                    fields: FieldFilter::All,
                });
            }
        }
    }

    let mut messages = Vec::new();
    let whole_file_iter = files
        .iter()
        .enumerate()
        .filter(|(index, _)| whole[*index])
        .map(|(_, file)| file);
    for file in whole_file_iter {
        for import in &file.imports {
            let types = match &import.selection {
                ImportSelection::Types(types) => types,
                ImportSelection::WholeFile => continue,
            };
            let search_order = reachable_files(files, import.target);
            for (type_name, fields) in types {
                let found = search_order.iter().find_map(|candidate| {
                    files[*candidate]
                        .type_definition(type_name)
                        .map(|definition| (*candidate, definition))
                });
                match found {
                    Some((found_file, definition)) => {
                        add_selection(&mut selected, found_file, definition, fields.clone())
                    }
                    None => messages.push(missing_type_error(
                        file,
                        import,
                        type_name,
                        &files[import.target].path,
                    )),
                }
            }
        }
    }
    if !messages.is_empty() {
        return Err(messages);
    }

    let mut names = selected
        .iter()
        .filter_map(|selection| match selected_definition(files, selection) {
            Definition::TypeDefinition(type_def) => {
                Some(type_definition_header(&type_def).0.to_string())
            }
            _ => None,
        })
        .collect::<HashSet<_>>();
    let mut next = 0;
    while next < selected.len() {
        let type_def = match selected_definition(files, &selected[next]) {
            Definition::TypeDefinition(type_def) => type_def,
            _ => {
                next += 1;
                continue;
            }
        };
        next += 1;
        for name in referenced_type_names(&type_def) {
            if BUILT_IN_SCALARS.contains(&name) || names.contains(name) {
                continue;
            }
            let found = files.iter().enumerate().find_map(|(file_index, file)| {
                file.type_definition(name)
                    .map(|definition| (file_index, definition))
            });
            // undefined references are left for the schema to report as unresolvable
            if let Some((file, definition)) = found {
                names.insert(name.to_string());
                selected.push(Selected {
                    file,
                    definition,
                    fields: FieldFilter::All,
                });
            }
        }
    }
    selected.sort_by_key(|selection| (selection.file, selection.definition));
    Ok(selected)
}

fn merge_root_fields(
    target: &mut Definition<'static, String>,
    object: &ObjectType<'static, String>,
) {
    if let Definition::TypeDefinition(TypeDefinition::Object(existing)) = target {
        for interface in &object.implements_interfaces {
            if !existing.implements_interfaces.contains(interface) {
                existing.implements_interfaces.push(interface.clone());
            }
        }
        for field in &object.fields {
            if !existing.fields.iter().any(|known| known.name == field.name) {
                existing.fields.push(field.clone());
            }
        }
    }
}

/// The definition of an emitted segment, in its original file.
#[derive(Debug)]
struct SourceSegment {
    file: usize,
    /// One based line of the combined document where this segment begins.
    start_line: usize,
    line_count: usize,
    position: Pos,
}

/// The combined schema text plus enough bookkeeping to point back at the
/// originating file for any line.
#[derive(Debug)]
pub struct SchemaSource {
    files: Vec<SchemaFile>,
    contents: String,
    segments: Vec<SourceSegment>,
}

impl SchemaSource {
    fn push_definition(&mut self, file: usize, position: Pos, text: &str) {
        if !self.contents.is_empty() {
            self.contents.push('\n');
        }
        let start_line = self.contents.matches('\n').count() + 1;
        self.contents.push_str(text);
        if !text.ends_with('\n') {
            self.contents.push('\n');
        }
        self.segments.push(SourceSegment {
            file,
            start_line,
            line_count: text.lines().count().max(1),
            position,
        });
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    fn locate(&self, position: &Pos) -> Option<&SourceSegment> {
        self.segments
            .iter()
            .find(|segment| position.line < segment.start_line + segment.line_count)
            .or_else(|| self.segments.last())
    }

    /// An error at a position of the combined document, reported against the
    /// definition it came from.
    pub fn compile_error(
        &self,
        title: &str,
        position: Option<&Pos>,
        help_text: Option<&str>,
    ) -> PrintableMessage {
        let located = position
            .and_then(|position| self.locate(position))
            .and_then(|segment| Some((self.files.get(segment.file)?, segment.position)));
        match (located, self.files.first()) {
            (Some((file, position)), _) => {
                located_error(title, &file.path, &file.contents, Some(&position), help_text)
            }
            (None, Some(root)) => located_error(title, &root.path, &root.contents, None, help_text),
            (None, None) => PrintableMessage::new_simple_compile_error(title),
        }
    }
}

fn definition_position(definition: &Definition<'_, String>) -> Pos {
    match definition {
        Definition::SchemaDefinition(schema_def) => schema_def.position,
        Definition::TypeDefinition(type_def) => type_definition_header(type_def).1,
        Definition::TypeExtension(_) | Definition::DirectiveDefinition(_) => Pos::default(),
    }
}

fn combine(files: Vec<SchemaFile>, selected: &[Selected]) -> SchemaSource {
    let definitions = selected
        .iter()
        .map(|selection| (selection.file, selected_definition(&files, selection)))
        .collect::<Vec<_>>();
    let mut root_names = DEFAULT_ROOT_TYPE_NAMES
        .iter()
        .map(|name| name.to_string())
        .collect::<HashSet<_>>();
    for (_, definition) in &definitions {
        if let Definition::SchemaDefinition(schema_def) = definition {
            for name in [&schema_def.query, &schema_def.mutation, &schema_def.subscription]
                .into_iter()
                .flatten()
            {
                root_names.insert(name.clone());
            }
        }
    }

    let mut emitted: Vec<(usize, Definition<'static, String>)> = Vec::new();
    let mut root_slots: HashMap<String, usize> = HashMap::new();
    for (file, definition) in definitions {
        if let Definition::TypeDefinition(TypeDefinition::Object(object)) = &definition {
            if root_names.contains(&object.name) {
                if let Some(slot) = root_slots.get(&object.name) {
                    merge_root_fields(&mut emitted[*slot].1, object);
                    continue;
                }
                root_slots.insert(object.name.clone(), emitted.len());
            }
        }
        emitted.push((file, definition));
    }

    let mut source = SchemaSource {
        files,
        contents: String::new(),
        segments: Vec::new(),
    };
    for (file, definition) in emitted {
        source.push_definition(file, definition_position(&definition), &definition.to_string());
    }
    source
}

/// Reads the schema at `path` and resolves its imports into one document.
pub fn load_schema_source(path: &Path) -> Result<SchemaSource, Vec<PrintableMessage>> {
    let contents = read_graphql_file(path).map_err(|message| vec![message])?;
    let mut loader = Loader::default();
    loader.load(path, contents);
    if !loader.messages.is_empty() {
        return Err(loader.messages);
    }
    let selected = select_definitions(&loader.files)?;
    Ok(combine(loader.files, &selected))
}
