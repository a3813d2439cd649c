//! Validated node catalog
//!
//! Loads `catalog.toml` and turns every [`NodeSpec`] into a [`Node`]:
//! dependency names are resolved to [`NodeId`]s, archive sources are checked
//! for download locations, folder names are derived, and every command or
//! option string is compiled into a [`Template`]. A catalog that loads is
//! guaranteed not to fail on any of these checks later.

use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::core::recipe::{
    BuildTool, CatalogFile, LocationSpec, NodeInfo, NodeSpec, PatchSpec, RecipeKind, SourceSpec,
};
use crate::core::template::{Template, Variables};
use crate::error::CatalogError;

/// Namespace a node lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Product,
    Dependency,
}

impl NodeKind {
    /// Lowercase label
    pub fn label(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Dependency => "dependency",
        }
    }
}

/// Identifies a node across both namespaces
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub kind: NodeKind,
    pub name: String,
}

impl NodeId {
    pub fn product(name: &str) -> Self {
        Self {
            kind: NodeKind::Product,
            name: name.to_string(),
        }
    }

    pub fn dependency(name: &str) -> Self {
        Self {
            kind: NodeKind::Dependency,
            name: name.to_string(),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Git checkout settings
#[derive(Debug, Clone, PartialEq)]
pub struct GitSource {
    pub url: String,
    pub branch: Option<String>,
    pub recursive: bool,
    pub no_update: bool,
    pub pull_request: Option<u32>,
}

/// Validated source strategy
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// Non-empty ordered mirror list
    Archive { locations: Vec<LocationSpec> },
    Git(GitSource),
    Hg { url: String, branch: Option<String> },
    Svn { url: String, revision: Option<String> },
    None,
}

/// Configure stage recipe
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigureStep {
    pub enabled: bool,
    pub options: Template,
    /// Replaces `./configure`
    pub command: Option<Template>,
    pub bootstrap: bool,
    pub clean_after: bool,
}

/// Build stage recipe
#[derive(Debug, Clone, PartialEq)]
pub struct BuildStep {
    pub enabled: bool,
    pub options: Template,
    pub command: Option<Template>,
    pub serial: bool,
    pub fallback: Vec<Template>,
}

/// Install stage recipe
#[derive(Debug, Clone, PartialEq)]
pub struct InstallStep {
    pub enabled: bool,
    pub options: Template,
    pub target: Template,
}

/// Hook command lists
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hooks {
    pub pre_patch: Vec<Template>,
    pub post_patch: Vec<Template>,
    pub post_configure: Vec<Template>,
    pub post_build: Vec<Template>,
    pub post_install: Vec<Template>,
}

/// Per-node environment adjustments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvRecipe {
    pub vars: BTreeMap<String, Template>,
    pub cflags_append: Option<Template>,
    pub cflags: Option<Template>,
    pub path: Option<Template>,
    pub flip_path: bool,
}

/// A validated catalog node
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub depends_on: Vec<NodeId>,
    /// Dependency inheriter: expanded, never built
    pub inherit_only: bool,
    pub skip_deps: bool,
    pub source: Source,
    /// Directory the source is acquired into
    pub folder_name: String,
    pub rename_folder: Option<String>,
    pub recipe: RecipeKind,
    pub tool: BuildTool,
    pub configure: ConfigureStep,
    pub build: BuildStep,
    pub install: InstallStep,
    pub source_subfolder: Option<String>,
    pub build_subdir: Option<String>,
    pub patches: Vec<PatchSpec>,
    pub hooks: Hooks,
    pub env: EnvRecipe,
    pub headers: Vec<String>,
    pub warnings: Vec<String>,
    pub info: NodeInfo,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.id.name
    }

    /// Directory name of the node's working tree
    pub fn dir_name(&self) -> &str {
        self.rename_folder.as_deref().unwrap_or(&self.folder_name)
    }
}

/// All nodes of a catalog, validated
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: BTreeMap<String, Node>,
    dependencies: BTreeMap<String, Node>,
}

impl Catalog {
    /// Load and validate a catalog file; relative patch paths resolve against its directory
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|e| CatalogError::ReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let base = std::fs::canonicalize(&base).unwrap_or(base);
        Self::from_toml_in(&content, &base)
    }

    /// Parse and validate catalog text; relative patch paths resolve against the current directory
    pub fn from_toml(content: &str) -> Result<Self, CatalogError> {
        Self::from_toml_in(content, Path::new("."))
    }

    fn from_toml_in(content: &str, base: &Path) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            toml::from_str(content).map_err(|e| CatalogError::ParseError(e.to_string()))?;
        Self::from_file(file, base)
    }

    /// Validate a parsed catalog document
    pub fn from_file(file: CatalogFile, base: &Path) -> Result<Self, CatalogError> {
        let mut variables = Variables::new();
        for (name, body) in &file.variables {
            let template = Template::parse_variable(body).map_err(|source| {
                CatalogError::InvalidVariable {
                    name: name.clone(),
                    source,
                }
            })?;
            variables.insert(name.clone(), template);
        }

        let builder = NodeBuilder {
            file: &file,
            variables: &variables,
            base,
        };

        let mut catalog = Self::default();
        for (name, spec) in &file.dependencies {
            let node = builder.build(NodeId::dependency(name), spec)?;
            catalog.dependencies.insert(name.clone(), node);
        }
        for (name, spec) in &file.products {
            let node = builder.build(NodeId::product(name), spec)?;
            catalog.products.insert(name.clone(), node);
        }
        Ok(catalog)
    }

    /// Look up a node by id
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        match id.kind {
            NodeKind::Product => self.products.get(&id.name),
            NodeKind::Dependency => self.dependencies.get(&id.name),
        }
    }

    /// Id of a product, or an error naming it
    pub fn product_id(&self, name: &str) -> Result<NodeId, CatalogError> {
        if self.products.contains_key(name) {
            Ok(NodeId::product(name))
        } else {
            Err(CatalogError::UnknownNode {
                kind: NodeKind::Product.label(),
                name: name.to_string(),
            })
        }
    }

    /// Id of a dependency, or an error naming it
    pub fn dependency_id(&self, name: &str) -> Result<NodeId, CatalogError> {
        if self.dependencies.contains_key(name) {
            Ok(NodeId::dependency(name))
        } else {
            Err(CatalogError::UnknownNode {
                kind: NodeKind::Dependency.label(),
                name: name.to_string(),
            })
        }
    }

    /// Products in name order
    pub fn products(&self) -> impl Iterator<Item = &Node> {
        self.products.values()
    }

    /// Dependencies in name order
    pub fn dependencies(&self) -> impl Iterator<Item = &Node> {
        self.dependencies.values()
    }
}

struct NodeBuilder<'a> {
    file: &'a CatalogFile,
    variables: &'a Variables,
    base: &'a Path,
}

impl NodeBuilder<'_> {
    fn build(&self, id: NodeId, spec: &NodeSpec) -> Result<Node, CatalogError> {
        let name = id.name.clone();
        let invalid = |message: &str| CatalogError::InvalidRecipe {
            node: name.clone(),
            message: message.to_string(),
        };

        let depends_on = spec
            .depends_on
            .iter()
            .map(|dep| self.resolve_dependency(&name, dep))
            .collect::<Result<Vec<_>, _>>()?;

        let source = match &spec.source {
            SourceSpec::Archive { locations } => {
                if locations.is_empty() {
                    return Err(CatalogError::EmptyLocations { node: name.clone() });
                }
                for hash in locations.iter().flat_map(|l| &l.hashes) {
                    if hash.sum.is_empty() || !hash.sum.chars().all(|c| c.is_ascii_hexdigit()) {
                        return Err(invalid(&format!(
                            "{} digest '{}' is not hexadecimal",
                            hash.algorithm, hash.sum
                        )));
                    }
                }
                Source::Archive {
                    locations: locations.clone(),
                }
            }
            SourceSpec::Git {
                url,
                branch,
                recursive,
                no_update,
                pull_request,
            } => Source::Git(GitSource {
                url: url.clone(),
                branch: branch.clone(),
                recursive: *recursive,
                no_update: *no_update,
                pull_request: *pull_request,
            }),
            SourceSpec::Hg { url, branch } => Source::Hg {
                url: url.clone(),
                branch: branch.clone(),
            },
            SourceSpec::Svn { url, revision } => Source::Svn {
                url: url.clone(),
                revision: revision.clone(),
            },
            SourceSpec::None => Source::None,
        };

        if spec.inherit_only && !matches!(source, Source::None) {
            return Err(invalid("a dependency inheriter cannot declare a source"));
        }

        let folder_name = match (&source, spec.folder_name.as_deref()) {
            (_, Some(folder)) => sanitize(folder),
            (Source::Archive { locations }, None) => archive_folder(&locations[0].url),
            (Source::Git(git), None) => vcs_folder(&git.url, "git"),
            (Source::Hg { url, .. }, None) => vcs_folder(url, "hg"),
            (Source::Svn { url, .. }, None) => vcs_folder(url, "svn"),
            (Source::None, None) if spec.inherit_only => sanitize(&name),
            (Source::None, None) => {
                return Err(invalid("a local source needs 'folder_name'"));
            }
        };
        let folder_name = match &source {
            Source::Svn { .. } if !folder_name.ends_with("_svn") => format!("{folder_name}_svn"),
            _ => folder_name,
        };

        let template = |key: &str, text: &str| {
            Template::parse(text, self.variables).map_err(|source| CatalogError::InvalidTemplate {
                node: name.clone(),
                key: key.to_string(),
                source,
            })
        };
        let optional = |key: &str, text: Option<&String>| text.map(|t| template(key, t)).transpose();
        let list = |key: &str, items: &[String]| {
            items
                .iter()
                .map(|t| template(key, t))
                .collect::<Result<Vec<_>, _>>()
        };

        let configure = ConfigureStep {
            enabled: spec.needs_configure && spec.recipe != RecipeKind::None,
            options: template("configure_options", &spec.configure_options)?,
            command: optional("configure_command", spec.configure_command.as_ref())?,
            bootstrap: spec.bootstrap,
            clean_after: spec.clean_post_configure,
        };
        let build = BuildStep {
            enabled: spec.needs_build,
            options: template("build_options", &spec.build_options)?,
            command: optional("build_command", spec.build_command.as_ref())?,
            serial: spec.serial_build,
            fallback: list("build_fallback", &spec.build_fallback)?,
        };
        let install = InstallStep {
            enabled: spec.needs_install,
            options: template("install_options", &spec.install_options)?,
            target: template(
                "install_target",
                spec.install_target.as_deref().unwrap_or("install"),
            )?,
        };
        let hooks = Hooks {
            pre_patch: list("run_pre_patch", &spec.run_pre_patch)?,
            post_patch: list("run_post_patch", &spec.run_post_patch)?,
            post_configure: list("run_post_configure", &spec.run_post_configure)?,
            post_build: list("run_post_build", &spec.run_post_build)?,
            post_install: list("run_post_install", &spec.run_post_install)?,
        };

        let mut vars = BTreeMap::new();
        for (key, value) in &spec.env {
            if key.is_empty() || key.contains('=') {
                return Err(invalid(&format!("invalid environment variable name '{key}'")));
            }
            vars.insert(key.clone(), template(&format!("env.{key}"), value)?);
        }
        let env = EnvRecipe {
            vars,
            cflags_append: optional("cflags_append", spec.cflags_append.as_ref())?,
            cflags: optional("cflags", spec.cflags.as_ref())?,
            path: optional("path", spec.path.as_ref())?,
            flip_path: spec.flip_path,
        };

        let patches = spec
            .patches
            .iter()
            .map(|p| PatchSpec {
                url: self.patch_url(&p.url),
                ..p.clone()
            })
            .collect();

        Ok(Node {
            id,
            depends_on,
            inherit_only: spec.inherit_only,
            skip_deps: spec.skip_deps,
            source,
            folder_name,
            rename_folder: spec.rename_folder.as_deref().map(sanitize),
            recipe: spec.recipe,
            tool: spec.build_tool.unwrap_or_else(|| spec.recipe.default_tool()),
            configure,
            build,
            install,
            source_subfolder: spec.source_subfolder.clone(),
            build_subdir: spec.build_subdir.clone(),
            patches,
            hooks,
            env,
            headers: spec.headers.clone(),
            warnings: spec.warnings.clone(),
            info: spec.info.clone(),
        })
    }

    /// Dependency names resolve in the dependency namespace first
    fn resolve_dependency(&self, node: &str, dep: &str) -> Result<NodeId, CatalogError> {
        if self.file.dependencies.contains_key(dep) {
            Ok(NodeId::dependency(dep))
        } else if self.file.products.contains_key(dep) {
            Ok(NodeId::product(dep))
        } else {
            Err(CatalogError::MissingDependency {
                node: node.to_string(),
                dependency: dep.to_string(),
            })
        }
    }

    fn patch_url(&self, url: &str) -> String {
        if url.contains("://") {
            return url.to_string();
        }
        let path = Path::new(url);
        let full: PathBuf = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base.join(path)
        };
        format!("file://{}", full.display())
    }
}

fn unsafe_chars() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._+-]").ok()).as_ref()
}

/// Replace characters that do not belong in a directory name
pub fn sanitize(name: &str) -> String {
    match unsafe_chars() {
        Some(re) => re.replace_all(name, "_").into_owned(),
        None => name.to_string(),
    }
}

/// Last path segment of a URL, without query or fragment
pub fn url_basename(url: &str) -> &str {
    let trimmed = url.split(['?', '#']).next().unwrap_or(url).trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

const ARCHIVE_SUFFIXES: &[&str] = &[
    ".tar.gz", ".tar.bz2", ".tar.xz", ".tar.lz", ".tar.zst", ".tgz", ".tbz2", ".txz", ".tar",
    ".zip",
];

/// Folder an archive extracts to by default: its file name without archive suffixes
pub fn archive_folder(url: &str) -> String {
    let base = url_basename(url);
    let stem = ARCHIVE_SUFFIXES
        .iter()
        .find_map(|suffix| base.strip_suffix(suffix))
        .unwrap_or_else(|| {
            Path::new(base)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(base)
        });
    sanitize(stem)
}

/// Folder a checkout goes to by default: `<basename>_<system>`
pub fn vcs_folder(url: &str, system: &str) -> String {
    let base = url_basename(url);
    let suffix = format!(".{system}");
    let stem = base.strip_suffix(&suffix).unwrap_or(base);
    format!("{}_{system}", sanitize(stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::template::{Field, FieldSource};
    use crate::test_utils::generators::{archive_url, node_name};
    use proptest::prelude::*;

    struct Ctx;

    impl FieldSource for Ctx {
        fn field(&self, field: Field) -> String {
            format!("<{}>", field.name())
        }
    }

    const CATALOG: &str = r#"
        [variables]
        common = "--host={target_host} --disable-shared"

        [dependencies.zlib]
        configure_options = "{var:common} --prefix={target_prefix}"
        source = { type = "archive", locations = [{ url = "https://zlib.net/zlib-1.3.1.tar.xz" }] }

        [dependencies.libpng]
        depends_on = ["zlib"]
        source = { type = "git", url = "https://github.com/glennrp/libpng.git" }
        recipe = "cmake"

        [dependencies.media_deps]
        inherit_only = true
        depends_on = ["zlib", "libpng"]

        [products.mpv]
        depends_on = ["media_deps"]
        recipe = "meson"
        source = { type = "git", url = "https://github.com/mpv-player/mpv" }
        info = { version = "0.38", fancy_name = "mpv" }
    "#;

    #[test]
    fn test_load_valid_catalog() {
        let catalog = Catalog::from_toml(CATALOG).unwrap();

        let zlib = catalog.node(&NodeId::dependency("zlib")).unwrap();
        assert_eq!(zlib.folder_name, "zlib-1.3.1");
        assert_eq!(
            zlib.configure.options.render(&Ctx),
            "--host=<target_host> --disable-shared --prefix=<target_prefix>"
        );
        assert_eq!(zlib.tool, BuildTool::Make);

        let mpv = catalog.node(&NodeId::product("mpv")).unwrap();
        assert_eq!(mpv.folder_name, "mpv_git");
        assert_eq!(mpv.tool, BuildTool::Ninja);
        assert_eq!(mpv.depends_on, vec![NodeId::dependency("media_deps")]);

        let libpng = catalog.node(&NodeId::dependency("libpng")).unwrap();
        assert_eq!(libpng.folder_name, "libpng_git");

        assert_eq!(catalog.products().count(), 1);
        assert_eq!(catalog.dependencies().count(), 3);
    }

    #[test]
    fn test_missing_dependency_names_referrer() {
        let err = Catalog::from_toml(
            r#"
            [products.app]
            folder_name = "app"
            depends_on = ["ghost"]
            "#,
        )
        .unwrap_err();

        match err {
            CatalogError::MissingDependency { node, dependency } => {
                assert_eq!(node, "app");
                assert_eq!(dependency, "ghost");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_empty_locations_rejected() {
        let err = Catalog::from_toml(
            r#"
            [dependencies.broken]
            source = { type = "archive", locations = [] }
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::EmptyLocations { node } if node == "broken"));
    }

    #[test]
    fn test_unknown_placeholder_rejected_at_load() {
        let err = Catalog::from_toml(
            r#"
            [dependencies.bad]
            folder_name = "bad"
            run_post_install = ["cp x {prefx}/lib"]
            "#,
        )
        .unwrap_err();

        match err {
            CatalogError::InvalidTemplate { node, key, .. } => {
                assert_eq!(node, "bad");
                assert_eq!(key, "run_post_install");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_local_source_requires_folder() {
        let err = Catalog::from_toml("[dependencies.local]\n").unwrap_err();
        assert!(matches!(err, CatalogError::InvalidRecipe { .. }));
    }

    #[test]
    fn test_inheriter_cannot_have_source() {
        let err = Catalog::from_toml(
            r#"
            [dependencies.group]
            inherit_only = true
            source = { type = "git", url = "https://example.com/x.git" }
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidRecipe { .. }));
    }

    #[test]
    fn test_non_hex_digest_rejected() {
        let err = Catalog::from_toml(
            r#"
            [dependencies.x]
            source = { type = "archive", locations = [{ url = "https://e.com/x.tar.gz", hashes = [{ type = "sha256", sum = "not-hex" }] }] }
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidRecipe { .. }));
    }

    #[test]
    fn test_dependency_namespace_wins() {
        let catalog = Catalog::from_toml(
            r#"
            [dependencies.ffmpeg]
            folder_name = "ffmpeg_dep"

            [products.ffmpeg]
            folder_name = "ffmpeg_prod"

            [products.player]
            folder_name = "player"
            depends_on = ["ffmpeg"]
            "#,
        )
        .unwrap();

        let player = catalog.node(&NodeId::product("player")).unwrap();
        assert_eq!(player.depends_on, vec![NodeId::dependency("ffmpeg")]);
    }

    #[test]
    fn test_relative_patch_becomes_file_url() {
        let catalog = Catalog::from_file(
            toml::from_str(
                r#"
                [dependencies.x]
                folder_name = "x"
                patches = [{ url = "patches/x.patch" }, { url = "https://e.com/y.patch", strip = 0 }]
                "#,
            )
            .unwrap(),
            Path::new("/srv/catalog"),
        )
        .unwrap();

        let node = catalog.node(&NodeId::dependency("x")).unwrap();
        assert_eq!(node.patches[0].url, "file:///srv/catalog/patches/x.patch");
        assert_eq!(node.patches[1].url, "https://e.com/y.patch");
        assert_eq!(node.patches[1].strip, 0);
    }

    #[test]
    fn test_unknown_node_lookup() {
        let catalog = Catalog::from_toml(CATALOG).unwrap();
        assert!(catalog.product_id("mpv").is_ok());
        assert!(matches!(
            catalog.product_id("zlib"),
            Err(CatalogError::UnknownNode { kind: "product", .. })
        ));
    }

    #[test]
    fn test_folder_derivation() {
        assert_eq!(archive_folder("https://e.com/dl/x264-0.164.tar.bz2"), "x264-0.164");
        assert_eq!(archive_folder("https://e.com/SDL2-2.30.zip?viasf=1"), "SDL2-2.30");
        assert_eq!(archive_folder("ftp://e.com/pub/lame-3.100.tgz"), "lame-3.100");
        assert_eq!(vcs_folder("https://e.com/repo/mpv.git", "git"), "mpv_git");
        assert_eq!(vcs_folder("https://e.com/repo/mpv/", "git"), "mpv_git");
        assert_eq!(vcs_folder("https://hg.e.com/x265", "hg"), "x265_hg");
        assert_eq!(sanitize("a b/c"), "a_b_c");
    }

    #[test]
    fn test_svn_folder_suffix() {
        let catalog = Catalog::from_toml(
            r#"
            [dependencies.xavs]
            folder_name = "xavs"
            source = { type = "svn", url = "https://svn.code.sf.net/p/xavs/code/trunk" }
            "#,
        )
        .unwrap();
        assert_eq!(
            catalog.node(&NodeId::dependency("xavs")).unwrap().folder_name,
            "xavs_svn"
        );
    }

    #[test]
    fn test_recipe_none_disables_configure() {
        let catalog = Catalog::from_toml(
            r#"
            [dependencies.hdr]
            folder_name = "hdr"
            recipe = "none"
            "#,
        )
        .unwrap();
        let node = catalog.node(&NodeId::dependency("hdr")).unwrap();
        assert!(!node.configure.enabled);
        assert!(node.build.enabled);
        assert_eq!(node.install.target.render(&Ctx), "install");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Archive folders are the file name minus its archive suffix
        #[test]
        fn prop_archive_folder_strips_suffix(url in archive_url()) {
            let folder = archive_folder(&url);
            let rest = url_basename(&url).strip_prefix(folder.as_str());
            prop_assert!(rest.is_some_and(|ext| ARCHIVE_SUFFIXES.contains(&ext)), "{url} -> {folder}");
        }

        /// Any node name loads and its archive tree lands in the derived folder
        #[test]
        fn prop_archive_node_loads(name in node_name(), url in archive_url()) {
            let catalog = Catalog::from_toml(&format!(
                "[dependencies.{name}]\nsource = {{ type = \"archive\", locations = [{{ url = \"{url}\" }}] }}"
            ))
            .unwrap();
            let id = catalog.dependency_id(&name).unwrap();
            let node = catalog.node(&id).unwrap();
            prop_assert_eq!(node.name(), name.as_str());
            prop_assert_eq!(node.dir_name(), archive_folder(&url));
        }
    }
}
