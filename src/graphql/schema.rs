//! Produce a linked type map from schema definition language
use super::import::SchemaSource;
use crate::cli::PrintableMessage;
use field::Field;
use graphql_parser::schema as parsed_schema;
use graphql_parser::Pos;
use std::collections::{HashMap, HashSet};

pub mod field;

pub(crate) const BUILT_IN_SCALARS: [&str; 5] = ["ID", "String", "Int", "Float", "Boolean"];
const INTROSPECTION_PREFIX: &str = "__";
const PARSE_ERROR_MARKER: &str = "Parse error at ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    fn keyword(&self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
        }
    }

    fn default_type_name(&self) -> &'static str {
        match self {
            OperationKind::Query => "Query",
            OperationKind::Mutation => "Mutation",
            OperationKind::Subscription => "Subscription",
        }
    }
}

#[derive(Debug)]
pub enum Error {
    Parse {
        message: String,
        position: Option<Pos>,
    },
    DuplicateType {
        name: String,
        position: Pos,
    },
    DuplicateSchemaDefinition(Pos),
    UnknownRootType {
        operation: OperationKind,
        name: String,
        position: Pos,
    },
    RootTypeNotObject {
        operation: OperationKind,
        name: String,
        position: Pos,
    },
}

impl Error {
    pub(crate) fn from_parse_error(error: parsed_schema::ParseError) -> Self {
        let text = error.to_string();
        let position = parse_error_position(&text);
        let details = text
            .lines()
            .filter(|line| !line.contains(PARSE_ERROR_MARKER))
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>();
        let message = if details.is_empty() {
            text.trim().to_string()
        } else {
            details.join("; ")
        };
        Error::Parse { message, position }
    }

    pub fn title(&self) -> String {
        match self {
            Error::Parse { message, .. } => format!("malformed schema: {message}"),
            Error::DuplicateType { name, .. } => format!("type `{name}` is defined more than once"),
            Error::DuplicateSchemaDefinition(_) => "multiple schema definitions".to_string(),
            Error::UnknownRootType {
                operation, name, ..
            } => format!("unknown {} root type `{name}`", operation.keyword()),
            Error::RootTypeNotObject {
                operation, name, ..
            } => format!("{} root type `{name}` is not an object type", operation.keyword()),
        }
    }

    pub fn position(&self) -> Option<&Pos> {
        match self {
            Error::Parse { position, .. } => position.as_ref(),
            Error::DuplicateType { position, .. }
            | Error::DuplicateSchemaDefinition(position)
            | Error::UnknownRootType { position, .. }
            | Error::RootTypeNotObject { position, .. } => Some(position),
        }
    }

    pub fn help_text(&self) -> Option<&'static str> {
        match self {
            Error::DuplicateType { .. } => {
                Some("Type names must be unique across the schema and all of its imports.")
            }
            Error::DuplicateSchemaDefinition(_) => {
                Some("A schema document may only contain one `schema { ... }` definition.")
            }
            Error::UnknownRootType { .. } => Some("Root operation types must be defined in the schema."),
            Error::Parse { .. } | Error::RootTypeNotObject { .. } => None,
        }
    }
}

fn parse_error_position(text: &str) -> Option<Pos> {
    let start = text.find(PARSE_ERROR_MARKER)? + PARSE_ERROR_MARKER.len();
    let coordinates = text[start..].split_whitespace().next()?;
    let (line, column) = coordinates.split_once(':')?;
    Some(Pos {
        line: line.parse().ok()?,
        column: column.parse().ok()?,
    })
}

impl From<(&SchemaSource, Error)> for PrintableMessage {
    fn from((source, error): (&SchemaSource, Error)) -> Self {
        source.compile_error(&error.title(), error.position(), error.help_text())
    }
}

/// Closed category of a named type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Scalar,
    Enum,
    Object,
    Interface,
    Union,
    InputObject,
}

impl TypeKind {
    /// The introspection `__TypeKind` name, used as a stable ordering tag.
    pub fn meta_kind(&self) -> &'static str {
        match self {
            TypeKind::Scalar => "SCALAR",
            TypeKind::Enum => "ENUM",
            TypeKind::Object => "OBJECT",
            TypeKind::Interface => "INTERFACE",
            TypeKind::Union => "UNION",
            TypeKind::InputObject => "INPUT_OBJECT",
        }
    }
}

#[derive(Debug)]
pub struct ObjectType {
    pub fields: Vec<Field>,
}

#[derive(Debug)]
pub enum TypeDefinition {
    Scalar,
    Enum,
    Object(ObjectType),
    Interface,
    Union,
    InputObject,
}

impl TypeDefinition {
    pub fn kind(&self) -> TypeKind {
        match self {
            TypeDefinition::Scalar => TypeKind::Scalar,
            TypeDefinition::Enum => TypeKind::Enum,
            TypeDefinition::Object(_) => TypeKind::Object,
            TypeDefinition::Interface => TypeKind::Interface,
            TypeDefinition::Union => TypeKind::Union,
            TypeDefinition::InputObject => TypeKind::InputObject,
        }
    }
}

#[derive(Debug)]
pub struct Type {
    pub name: String,
    pub definition: TypeDefinition,
}

impl Type {
    pub fn is_introspection(&self) -> bool {
        self.name.starts_with(INTROSPECTION_PREFIX)
    }
}

/// Every named type of a schema, iterable in discovery order. Types reachable
/// from the root operation types come first, depth first in declaration order.
/// Unreachable types follow in document order and unused built-in scalars last.
#[derive(Debug)]
pub struct TypeMap {
    types: HashMap<String, Type>,
    discovery_order: Vec<String>,
}

impl TypeMap {
    pub fn iter(&self) -> impl Iterator<Item = &Type> {
        self.discovery_order
            .iter()
            .filter_map(move |name| self.types.get(name))
    }
}

#[derive(Debug, Default)]
pub struct RootOperationTypes {
    pub query: Option<String>,
    pub mutation: Option<String>,
    pub subscription: Option<String>,
}

impl RootOperationTypes {
    fn slot_mut(&mut self, operation: OperationKind) -> &mut Option<String> {
        match operation {
            OperationKind::Query => &mut self.query,
            OperationKind::Mutation => &mut self.mutation,
            OperationKind::Subscription => &mut self.subscription,
        }
    }

    pub fn contains(&self, type_name: &str) -> bool {
        [&self.query, &self.mutation, &self.subscription]
            .iter()
            .any(|root| root.as_deref() == Some(type_name))
    }
}

#[derive(Debug)]
pub struct Schema {
    type_map: TypeMap,
    root_operation_types: RootOperationTypes,
}

pub(crate) fn type_definition_header<'a>(
    definition: &'a parsed_schema::TypeDefinition<'_, String>,
) -> (&'a str, Pos, TypeKind) {
    match definition {
        parsed_schema::TypeDefinition::Scalar(scalar) => {
            (scalar.name.as_str(), scalar.position, TypeKind::Scalar)
        }
        parsed_schema::TypeDefinition::Object(object) => {
            (object.name.as_str(), object.position, TypeKind::Object)
        }
        parsed_schema::TypeDefinition::Interface(interface) => {
            (interface.name.as_str(), interface.position, TypeKind::Interface)
        }
        parsed_schema::TypeDefinition::Union(union) => (union.name.as_str(), union.position, TypeKind::Union),
        parsed_schema::TypeDefinition::Enum(enumeration) => {
            (enumeration.name.as_str(), enumeration.position, TypeKind::Enum)
        }
        parsed_schema::TypeDefinition::InputObject(input) => {
            (input.name.as_str(), input.position, TypeKind::InputObject)
        }
    }
}

fn named_type<'a>(field_type: &'a parsed_schema::Type<'_, String>) -> &'a str {
    match field_type {
        parsed_schema::Type::NamedType(name) => name.as_str(),
        parsed_schema::Type::ListType(inner) | parsed_schema::Type::NonNullType(inner) => {
            named_type(inner)
        }
    }
}

fn field_references<'a>(fields: &'a [parsed_schema::Field<'_, String>], names: &mut Vec<&'a str>) {
    for field in fields {
        names.extend(
            field
                .arguments
                .iter()
                .map(|argument| named_type(&argument.value_type)),
        );
        names.push(named_type(&field.field_type));
    }
}

/// Named types a definition refers to, in declaration order. Interfaces come
/// before fields and a field's arguments before its own type.
pub(crate) fn referenced_type_names<'a>(
    definition: &'a parsed_schema::TypeDefinition<'_, String>,
) -> Vec<&'a str> {
    let mut names = Vec::new();
    match definition {
        parsed_schema::TypeDefinition::Object(object) => {
            names.extend(object.implements_interfaces.iter().map(String::as_str));
            field_references(&object.fields, &mut names);
        }
        parsed_schema::TypeDefinition::Interface(interface) => {
            names.extend(interface.implements_interfaces.iter().map(String::as_str));
            field_references(&interface.fields, &mut names);
        }
        parsed_schema::TypeDefinition::Union(union) => {
            names.extend(union.types.iter().map(String::as_str));
        }
        parsed_schema::TypeDefinition::InputObject(input) => {
            names.extend(input.fields.iter().map(|field| named_type(&field.value_type)));
        }
        parsed_schema::TypeDefinition::Scalar(_) | parsed_schema::TypeDefinition::Enum(_) => {}
    }
    names
}

fn root_operation_types(
    schema_definition: Option<&parsed_schema::SchemaDefinition<'_, String>>,
    kinds: &HashMap<String, TypeKind>,
) -> Result<RootOperationTypes, Error> {
    let roots = match schema_definition {
        Some(schema_def) => {
            let mut roots = RootOperationTypes::default();
            let declared_roots = [
                (OperationKind::Query, &schema_def.query),
                (OperationKind::Mutation, &schema_def.mutation),
                (OperationKind::Subscription, &schema_def.subscription),
            ];
            for (operation, declared_name) in declared_roots {
                let name = match declared_name {
                    Some(name) => name,
                    None => continue,
                };
                match kinds.get(name) {
                    Some(TypeKind::Object) => *roots.slot_mut(operation) = Some(name.clone()),
                    Some(_) => {
                        return Err(Error::RootTypeNotObject {
                            operation,
                            name: name.clone(),
                            position: schema_def.position,
                        })
                    }
                    None => {
                        return Err(Error::UnknownRootType {
                            operation,
                            name: name.clone(),
                            position: schema_def.position,
                        })
                    }
                }
            }
            roots
        }
        None => {
            let mut roots = RootOperationTypes::default();
            for operation in [
                OperationKind::Query,
                OperationKind::Mutation,
                OperationKind::Subscription,
            ] {
                let name = operation.default_type_name();
                if kinds.get(name) == Some(&TypeKind::Object) {
                    *roots.slot_mut(operation) = Some(name.to_string());
                }
            }
            roots
        }
    };
    Ok(roots)
}

fn discovery_order(
    roots: &RootOperationTypes,
    declared: &[&parsed_schema::TypeDefinition<'_, String>],
) -> Vec<String> {
    let by_name = declared
        .iter()
        .map(|definition| (type_definition_header(definition).0, *definition))
        .collect::<HashMap<_, _>>();
    let mut starts = [&roots.query, &roots.mutation, &roots.subscription]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect::<Vec<_>>();
    starts.extend(declared.iter().map(|definition| type_definition_header(definition).0));
    for name in BUILT_IN_SCALARS {
        starts.push(name);
    }

    let mut order = Vec::new();
    let mut seen = HashSet::new();
    for start in starts {
        let mut stack = vec![start];
        while let Some(name) = stack.pop() {
            if !seen.insert(name) {
                continue;
            }
            let definition = by_name.get(name);
            // undefined names never make it into the type map
            if definition.is_none() && !BUILT_IN_SCALARS.contains(&name) {
                continue;
            }
            order.push(name.to_string());
            if let Some(definition) = definition {
                stack.extend(referenced_type_names(definition).into_iter().rev());
            }
        }
    }
    order
}

impl Schema {
    /// Parse schema definition language and link it into a type map. Type
    /// extensions and directive definitions are ignored.
    pub fn parse(contents: &str) -> Result<Self, Error> {
        let document =
            graphql_parser::parse_schema::<String>(contents).map_err(Error::from_parse_error)?;

        let mut kinds = BUILT_IN_SCALARS
            .iter()
            .map(|name| (name.to_string(), TypeKind::Scalar))
            .collect::<HashMap<_, _>>();
        let mut schema_definition = None;
        let mut declared = Vec::new();
        for definition in &document.definitions {
            match definition {
                parsed_schema::Definition::SchemaDefinition(schema_def) => {
                    if schema_definition.is_some() {
                        return Err(Error::DuplicateSchemaDefinition(schema_def.position));
                    }
                    schema_definition = Some(schema_def);
                }
                parsed_schema::Definition::TypeDefinition(type_def) => {
                    let (name, position, kind) = type_definition_header(type_def);
                    let redefines_built_in =
                        kind == TypeKind::Scalar && BUILT_IN_SCALARS.contains(&name);
                    if redefines_built_in {
                        continue;
                    }
                    if kinds.insert(name.to_string(), kind).is_some() {
                        return Err(Error::DuplicateType {
                            name: name.to_string(),
                            position,
                        });
                    }
                    declared.push(type_def);
                }
                parsed_schema::Definition::TypeExtension(_)
                | parsed_schema::Definition::DirectiveDefinition(_) => {}
            }
        }

        let root_operation_types = root_operation_types(schema_definition, &kinds)?;
        let discovery_order = discovery_order(&root_operation_types, &declared);

        let mut types = BUILT_IN_SCALARS
            .iter()
            .map(|name| {
                let built_in = Type {
                    name: name.to_string(),
                    definition: TypeDefinition::Scalar,
                };
                (name.to_string(), built_in)
            })
            .collect::<HashMap<_, _>>();
        for type_def in declared {
            let (name, _, _) = type_definition_header(type_def);
            let definition = match type_def {
                parsed_schema::TypeDefinition::Object(object) => {
                    let fields = object
                        .fields
                        .iter()
                        .map(|field| Field::link(field, &kinds))
                        .collect();
                    TypeDefinition::Object(ObjectType { fields })
                }
                parsed_schema::TypeDefinition::Scalar(_) => TypeDefinition::Scalar,
                parsed_schema::TypeDefinition::Enum(_) => TypeDefinition::Enum,
                parsed_schema::TypeDefinition::Interface(_) => TypeDefinition::Interface,
                parsed_schema::TypeDefinition::Union(_) => TypeDefinition::Union,
                parsed_schema::TypeDefinition::InputObject(_) => TypeDefinition::InputObject,
            };
            types.insert(
                name.to_string(),
                Type {
                    name: name.to_string(),
                    definition,
                },
            );
        }

        Ok(Schema {
            type_map: TypeMap {
                types,
                discovery_order,
            },
            root_operation_types,
        })
    }

    pub fn type_map(&self) -> &TypeMap {
        &self.type_map
    }

    pub fn is_root_operation_type(&self, type_name: &str) -> bool {
        self.root_operation_types.contains(type_name)
    }
}
