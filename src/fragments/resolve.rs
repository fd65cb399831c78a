use crate::graphql::schema::field::FieldType;

/// What a field selects, once its list and non-null modifiers are stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedFieldKind<'a> {
    Scalar,
    Enum,
    Object(&'a str),
    Unresolvable,
}

pub fn resolve_field_type(field_type: &FieldType) -> ResolvedFieldKind<'_> {
    let mut current = field_type;
    loop {
        current = match current {
            FieldType::List(inner) | FieldType::NonNull(inner) => &**inner,
            FieldType::Scalar(_) => return ResolvedFieldKind::Scalar,
            FieldType::Enum(_) => return ResolvedFieldKind::Enum,
            FieldType::Object(name) => return ResolvedFieldKind::Object(name),
            FieldType::Unresolvable(_) => return ResolvedFieldKind::Unresolvable,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named_object(name: &str) -> FieldType {
        FieldType::Object(name.to_string())
    }

    fn non_null(inner: FieldType) -> FieldType {
        FieldType::NonNull(Box::new(inner))
    }

    fn list(inner: FieldType) -> FieldType {
        FieldType::List(Box::new(inner))
    }

    #[test]
    fn wrapped_and_bare_objects_resolve_identically() {
        let bare = named_object("Foo");
        let wrapped = non_null(list(non_null(named_object("Foo"))));
        let nested_lists = list(list(named_object("Foo")));
        assert_eq!(resolve_field_type(&bare), ResolvedFieldKind::Object("Foo"));
        assert_eq!(resolve_field_type(&wrapped), resolve_field_type(&bare));
        assert_eq!(resolve_field_type(&nested_lists), resolve_field_type(&bare));
    }

    #[test]
    fn scalars_enums_and_unresolvable() {
        assert_eq!(
            resolve_field_type(&non_null(FieldType::Scalar("ID".to_string()))),
            ResolvedFieldKind::Scalar
        );
        assert_eq!(
            resolve_field_type(&list(FieldType::Enum("Kind".to_string()))),
            ResolvedFieldKind::Enum
        );
        assert_eq!(
            resolve_field_type(&non_null(list(FieldType::Unresolvable("Node".to_string())))),
            ResolvedFieldKind::Unresolvable
        );
    }
}
