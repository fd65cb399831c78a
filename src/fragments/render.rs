use super::{Dialect, FragmentSet, FragmentVariant};

const HEADER: [&str; 2] = [
    concat!("THIS FILE HAS BEEN AUTO-GENERATED BY \"", env!("CARGO_PKG_NAME"), "\""),
    "DO NOT EDIT THIS FILE DIRECTLY",
];

fn section_comment(variant: FragmentVariant) -> &'static [&'static str] {
    match variant {
        FragmentVariant::Standard => &[
            "Standard Fragments",
            "Nested fragments will spread one layer deep",
        ],
        FragmentVariant::NoRelations => &["No Relational objects", "No nested fragments"],
        FragmentVariant::Deep => &[
            "Deeply nested Fragments",
            "Will include n nested fragments",
            "If there is a recursive relation you will receive a",
            "\"Cannot spread fragment within itself\" error when using",
        ],
    }
}

/// Serialize all three fragment lists into one document of the given dialect.
pub fn render(fragments: &FragmentSet, dialect: Dialect) -> String {
    let comment = dialect.comment_prefix();
    let mut output = String::new();
    for line in HEADER {
        output.push_str(&format!("{comment} {line}\n"));
    }
    for variant in FragmentVariant::ALL {
        output.push('\n');
        for line in section_comment(variant) {
            output.push_str(&format!("{comment} {line}\n"));
        }
        for definition in fragments.for_variant(variant) {
            output.push('\n');
            match dialect {
                Dialect::GraphQL => output.push_str(&definition.body),
                Dialect::Module => output.push_str(&format!(
                    "export const {} = `{}`\n",
                    definition.binding_name(),
                    definition.body
                )),
            }
        }
    }
    output
}
