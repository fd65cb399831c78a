use super::TypeKind;
use graphql_parser::schema as parsed_schema;
use std::collections::HashMap;

/// A field's type reference after linking against the type map. Named
/// references carry the category of the type they point at; anything that
/// is not a scalar, enum or object is `Unresolvable`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Scalar(String),
    Enum(String),
    Object(String),
    List(Box<FieldType>),
    NonNull(Box<FieldType>),
    Unresolvable(String),
}

impl FieldType {
    pub(super) fn link(
        parsed: &parsed_schema::Type<'_, String>,
        kinds: &HashMap<String, TypeKind>,
    ) -> Self {
        match parsed {
            parsed_schema::Type::NamedType(name) => match kinds.get(name) {
                Some(TypeKind::Scalar) => FieldType::Scalar(name.clone()),
                Some(TypeKind::Enum) => FieldType::Enum(name.clone()),
                Some(TypeKind::Object) => FieldType::Object(name.clone()),
                _ => FieldType::Unresolvable(name.clone()),
            },
            parsed_schema::Type::ListType(inner) => {
                FieldType::List(Box::new(FieldType::link(inner, kinds)))
            }
            parsed_schema::Type::NonNullType(inner) => {
                FieldType::NonNull(Box::new(FieldType::link(inner, kinds)))
            }
        }
    }
}

/// A field's declared name and linked type, in declaration order.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub type_description: FieldType,
}

impl Field {
    pub(super) fn link(
        parsed: &parsed_schema::Field<'_, String>,
        kinds: &HashMap<String, TypeKind>,
    ) -> Self {
        Field {
            name: parsed.name.clone(),
            type_description: FieldType::link(&parsed.field_type, kinds),
        }
    }
}
