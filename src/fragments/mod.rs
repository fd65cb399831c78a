use crate::graphql::schema::{self, Schema};

mod assemble;
mod render;
mod resolve;

pub use render::render;

const MODULE_GENERATOR_SUFFIX: &str = "js";

/// Output syntax of the generated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    GraphQL,
    Module,
}

impl Dialect {
    pub fn from_generator(generator: &str) -> Self {
        if generator.ends_with(MODULE_GENERATOR_SUFFIX) {
            Dialect::Module
        } else {
            Dialect::GraphQL
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Dialect::GraphQL => "graphql",
            Dialect::Module => "js",
        }
    }

    fn comment_prefix(&self) -> &'static str {
        match self {
            Dialect::GraphQL => "#",
            Dialect::Module => "//",
        }
    }
}

/// How object-typed fields are selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentVariant {
    /// Relations spread the related type's `NoRelations` fragment, one hop deep.
    Standard,
    /// Relations are left out.
    NoRelations,
    /// Relations spread the related type's `Deep` fragment. Cyclic type
    /// graphs produce fragments that spread themselves, which query
    /// validation rejects when they are used.
    Deep,
}

impl FragmentVariant {
    pub const ALL: [FragmentVariant; 3] = [
        FragmentVariant::Standard,
        FragmentVariant::NoRelations,
        FragmentVariant::Deep,
    ];

    fn name_suffix(&self) -> &'static str {
        match self {
            FragmentVariant::Standard => "",
            FragmentVariant::NoRelations => "NoNesting",
            FragmentVariant::Deep => "DeepNesting",
        }
    }

    pub fn fragment_name(&self, type_name: &str) -> String {
        format!("{type_name}{}", self.name_suffix())
    }

    /// The variant spread inside a relation field, if relations are selected at all.
    fn nested_spread(&self) -> Option<FragmentVariant> {
        match self {
            FragmentVariant::Standard => Some(FragmentVariant::NoRelations),
            FragmentVariant::NoRelations => None,
            FragmentVariant::Deep => Some(FragmentVariant::Deep),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentDefinition {
    pub type_name: String,
    pub variant: FragmentVariant,
    pub body: String,
}

impl FragmentDefinition {
    pub fn name(&self) -> String {
        self.variant.fragment_name(&self.type_name)
    }

    pub fn binding_name(&self) -> String {
        format!("{}Fragment", self.name())
    }
}

/// The three fragment lists of one compile, each in candidate order.
#[derive(Debug, Default)]
pub struct FragmentSet {
    pub standard: Vec<FragmentDefinition>,
    pub no_relations: Vec<FragmentDefinition>,
    pub deep: Vec<FragmentDefinition>,
}

impl FragmentSet {
    pub fn for_variant(&self, variant: FragmentVariant) -> &[FragmentDefinition] {
        match variant {
            FragmentVariant::Standard => &self.standard,
            FragmentVariant::NoRelations => &self.no_relations,
            FragmentVariant::Deep => &self.deep,
        }
    }
}

pub struct Compile {
    pub fragments: FragmentSet,
    pub contents: String,
}

/// Compile fragments for every eligible object type of `schema_text`. Performs
/// no I/O; the only failure is a schema that does not parse or link.
pub fn compile(schema_text: &str, dialect: Dialect) -> Result<Compile, schema::Error> {
    let schema = Schema::parse(schema_text)?;
    let fragments = assemble::assemble(&schema);
    let contents = render(&fragments, dialect);
    Ok(Compile {
        fragments,
        contents,
    })
}
