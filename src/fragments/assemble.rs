use super::resolve::{resolve_field_type, ResolvedFieldKind};
use super::{FragmentDefinition, FragmentSet, FragmentVariant};
use crate::graphql::schema::field::Field;
use crate::graphql::schema::{Schema, TypeDefinition};

/// Selected when nothing else is, so the fragment stays valid GraphQL.
const EMPTY_SELECTION: &str = "__typename";

/// An object type that gets fragments.
#[derive(Debug)]
pub struct ObjectTypeCandidate<'a> {
    pub name: &'a str,
    pub meta_kind: &'static str,
    pub fields: &'a [Field],
}

/// Object types that are neither introspection types nor root operation types,
/// ordered by meta-kind and then discovery order.
pub fn object_type_candidates(schema: &Schema) -> Vec<ObjectTypeCandidate<'_>> {
    let mut candidates = schema
        .type_map()
        .iter()
        .filter(|named_type| !named_type.is_introspection())
        .filter(|named_type| !schema.is_root_operation_type(&named_type.name))
        .filter_map(|named_type| match &named_type.definition {
            TypeDefinition::Object(object_type) => Some(ObjectTypeCandidate {
                name: &named_type.name,
                meta_kind: named_type.definition.kind().meta_kind(),
                fields: &object_type.fields,
            }),
            _ => None,
        })
        .collect::<Vec<_>>();
    candidates.sort_by_key(|candidate| candidate.meta_kind);
    candidates
}

fn compile_selection(field: &Field, variant: FragmentVariant) -> Option<String> {
    match resolve_field_type(&field.type_description) {
        ResolvedFieldKind::Scalar | ResolvedFieldKind::Enum => Some(field.name.clone()),
        ResolvedFieldKind::Object(related_type_name) => variant.nested_spread().map(|nested| {
            format!(
                "{} {{\n    ...{}\n  }}",
                field.name,
                nested.fragment_name(related_type_name)
            )
        }),
        ResolvedFieldKind::Unresolvable => None,
    }
}

fn compile_fragment(candidate: &ObjectTypeCandidate, variant: FragmentVariant) -> FragmentDefinition {
    let mut selections = candidate
        .fields
        .iter()
        .filter_map(|field| compile_selection(field, variant))
        .collect::<Vec<_>>();
    if selections.is_empty() {
        selections.push(EMPTY_SELECTION.to_string());
    }
    let body = format!(
        "fragment {} on {} {{\n  {}\n}}\n",
        variant.fragment_name(candidate.name),
        candidate.name,
        selections.join("\n  ")
    );
    FragmentDefinition {
        type_name: candidate.name.to_string(),
        variant,
        body,
    }
}

pub fn assemble(schema: &Schema) -> FragmentSet {
    let candidates = object_type_candidates(schema);
    let fragments_for = |variant: FragmentVariant| -> Vec<FragmentDefinition> {
        candidates
            .iter()
            .map(|candidate| compile_fragment(candidate, variant))
            .collect()
    };
    FragmentSet {
        standard: fragments_for(FragmentVariant::Standard),
        no_relations: fragments_for(FragmentVariant::NoRelations),
        deep: fragments_for(FragmentVariant::Deep),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(contents: &str) -> Schema {
        Schema::parse(contents).unwrap()
    }

    fn body_of<'a>(list: &'a [FragmentDefinition], type_name: &str) -> &'a str {
        &list
            .iter()
            .find(|definition| definition.type_name == type_name)
            .unwrap()
            .body
    }

    #[test]
    fn candidates_exclude_roots_and_introspection() {
        let schema = schema(
            "
type Query { a: Int }
type Mutation { a: Int }
type Subscription { a: Int }
type __Hidden { a: Int }
interface Named { name: String }
input BookInput { title: String }
type Book { a: Int }
type Author { a: Int }
",
        );
        let names = object_type_candidates(&schema)
            .iter()
            .map(|candidate| candidate.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Book", "Author"]);
    }

    #[test]
    fn candidates_follow_references_from_the_query_root() {
        let schema =
            schema("type Author { id: ID } type Book { author: Author } type Query { books: [Book] }");
        let names = object_type_candidates(&schema)
            .iter()
            .map(|candidate| candidate.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Book", "Author"]);
    }

    #[test]
    fn candidates_without_optional_roots() {
        let schema = schema("type Query { a: Int } type Mutation { a: Int } type Book { a: Int }");
        let candidates = object_type_candidates(&schema);
        // three object types, two of them defined roots
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].meta_kind, "OBJECT");
    }

    #[test]
    fn scalar_and_enum_fields_appear_in_every_variant() {
        let fragments = assemble(&schema(
            "
type Query { shelf: Shelf }
enum Genre { FICTION }
scalar DateTime
type Shelf { label: String! genre: Genre createdAt: DateTime books: [Book] }
type Book { id: ID }
",
        ));
        for variant in FragmentVariant::ALL {
            let body = body_of(fragments.for_variant(variant), "Shelf");
            for field in ["label", "genre", "createdAt"] {
                assert!(body.contains(&format!("\n  {field}\n")), "{field} missing in {body}");
            }
        }
        assert!(!body_of(&fragments.no_relations, "Shelf").contains("books"));
        assert!(body_of(&fragments.standard, "Shelf").contains("books {\n    ...BookNoNesting\n  }"));
        assert!(body_of(&fragments.deep, "Shelf").contains("books {\n    ...BookDeepNesting\n  }"));
    }

    #[test]
    fn self_reference_spreads_itself_in_deep_variant() {
        let fragments = assemble(&schema("type Node { id: ID! next: Node }"));
        assert_eq!(
            body_of(&fragments.deep, "Node"),
            "fragment NodeDeepNesting on Node {\n  id\n  next {\n    ...NodeDeepNesting\n  }\n}\n"
        );
        assert_eq!(
            body_of(&fragments.standard, "Node"),
            "fragment Node on Node {\n  id\n  next {\n    ...NodeNoNesting\n  }\n}\n"
        );
    }

    #[test]
    fn unresolvable_fields_are_omitted_everywhere() {
        let fragments = assemble(&schema(
            "
interface Named { name: String }
union Result = Book
type Book { id: ID named: Named results: [Result!]! publisher: Publisher }
",
        ));
        for variant in FragmentVariant::ALL {
            let body = body_of(fragments.for_variant(variant), "Book");
            assert_eq!(
                body,
                format!("fragment {} on Book {{\n  id\n}}\n", variant.fragment_name("Book"))
            );
        }
    }

    #[test]
    fn empty_selection_falls_back_to_typename() {
        let fragments = assemble(&schema("type Edge { node: Node! } type Node { id: ID }"));
        assert_eq!(
            body_of(&fragments.no_relations, "Edge"),
            "fragment EdgeNoNesting on Edge {\n  __typename\n}\n"
        );
    }

    #[test]
    fn fragments_follow_candidate_order() {
        let fragments = assemble(&schema("type B { a: Int } type A { a: Int } type C { a: Int }"));
        for variant in FragmentVariant::ALL {
            let names = fragments
                .for_variant(variant)
                .iter()
                .map(|definition| definition.type_name.as_str())
                .collect::<Vec<_>>();
            assert_eq!(names, vec!["B", "A", "C"]);
        }
    }
}
