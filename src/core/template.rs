//! Typed command templates
//!
//! Recipe strings reference build context values as `{field}` and catalog
//! variables as `{var:NAME}`. Both are resolved when the catalog is loaded:
//! an unknown placeholder is a configuration error, never a shell-time one.
//! `{{` and `}}` produce literal braces.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::TemplateError;

macro_rules! fields {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Build context values available to templates
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Field {
            $($variant),*
        }

        impl Field {
            /// Every field, in declaration order
            pub const ALL: &'static [Field] = &[$(Field::$variant),*];

            /// Placeholder name
            pub fn name(self) -> &'static str {
                match self {
                    $(Field::$variant => $name),*
                }
            }

            /// Look up a placeholder name
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Field::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

fields! {
    CmakePrefixOptions => "cmake_prefix_options",
    MakePrefixOptions => "make_prefix_options",
    PkgConfigPath => "pkg_config_path",
    ToolchainBin => "toolchain_bin",
    ToolchainBin2 => "toolchain_bin2",
    CrossPrefixBare => "cross_prefix_bare",
    CrossPrefixFull => "cross_prefix_full",
    TargetPrefix => "target_prefix",
    InTreePrefix => "in_tree_prefix",
    OfftreePrefix => "offtree_prefix",
    TargetHost => "target_host",
    TargetSubPrefix => "target_sub_prefix",
    BitName => "bit_name",
    BitName2 => "bit_name2",
    BitName3 => "bit_name3",
    BitNameWin => "bit_name_win",
    BitNum => "bit_num",
    ProductPrefix => "product_prefix",
    TargetPrefixSedEscaped => "target_prefix_sed_escaped",
    MakeCpuCount => "make_cpu_count",
    CpuCount => "cpu_count",
    OriginalCflags => "original_cflags",
    CflagString => "cflag_string",
    CurrentPath => "current_path",
    CurrentEnvPath => "current_envpath",
    MesonEnvFile => "meson_env_file",
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.name())
    }
}

/// Supplies field values at render time
pub trait FieldSource {
    /// Value of `field`
    fn field(&self, field: Field) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// Compiled catalog variables, spliced into templates that reference them
pub type Variables = BTreeMap<String, Template>;

/// A compiled template
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Compile a template that may reference catalog variables
    pub fn parse(source: &str, variables: &Variables) -> Result<Self, TemplateError> {
        Self::compile(source, Some(variables))
    }

    /// Compile a catalog variable body; it may only use fields
    pub fn parse_variable(source: &str) -> Result<Self, TemplateError> {
        Self::compile(source, None)
    }

    fn compile(source: &str, variables: Option<&Variables>) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((offset, c)) = chars.next() {
            match c {
                '{' if chars.peek().map(|&(_, n)| n) == Some('{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek().map(|&(_, n)| n) == Some('}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => return Err(TemplateError::Unbalanced { brace: '}', offset }),
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some((_, '}')) => break,
                            Some((_, '{')) | None => {
                                return Err(TemplateError::Unbalanced { brace: '{', offset })
                            }
                            Some((_, ch)) => name.push(ch),
                        }
                    }

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }

                    if let Some(var) = name.strip_prefix("var:") {
                        let variables = variables.ok_or_else(|| TemplateError::NestedVariable {
                            name: var.to_string(),
                        })?;
                        let body = variables.get(var).ok_or_else(|| {
                            TemplateError::UnknownVariable {
                                name: var.to_string(),
                            }
                        })?;
                        segments.extend(body.segments.iter().cloned());
                    } else {
                        let field = Field::from_name(&name)
                            .ok_or(TemplateError::UnknownField { name })?;
                        segments.push(Segment::Field(field));
                    }
                }
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// Substitute every field from `values`
    pub fn render(&self, values: &impl FieldSource) -> String {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(field) => out.push_str(&values.field(*field)),
            }
        }
        out
    }
}
