mod highlight;
mod scheme;
mod template;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use mdpopups_core::{
    BASE_CSS, DEFAULT_CSS, MdPopups, ResourceError, ResourceLoader, SettingsSource,
};

pub use highlight::{CLASS_PREFIX, ClassedHighlighter, ThemedHighlighter};
pub use scheme::{SchemeCss, SyntectSchemeLoader};
pub use template::{TemplateValue, Variables, render as render_template};

const BUNDLED_BASE_CSS: &str = include_str!("../assets/base.css");
const BUNDLED_DEFAULT_CSS: &str = include_str!("../assets/default.css");

/// Resources from an optional `Packages` directory on disk, falling back to
/// the stylesheets compiled into this crate.
#[derive(Clone, Debug, Default)]
pub struct BundledResources {
    packages: Option<PathBuf>,
}

impl BundledResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `Packages/...` paths below `dir`.
    pub fn with_packages_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            packages: Some(dir.into()),
        }
    }

    fn on_disk(&self, path: &str) -> Option<PathBuf> {
        let dir = self.packages.as_deref()?;
        let relative = path.strip_prefix("Packages/").unwrap_or(path);
        Some(dir.join(Path::new(relative)))
    }

    fn bundled(path: &str) -> Option<&'static str> {
        match path {
            BASE_CSS => Some(BUNDLED_BASE_CSS),
            DEFAULT_CSS => Some(BUNDLED_DEFAULT_CSS),
            _ => None,
        }
    }
}

impl ResourceLoader for BundledResources {
    fn load_binary(&self, path: &str) -> Result<Vec<u8>, ResourceError> {
        if let Some(file) = self.on_disk(path) {
            match fs::read(&file) {
                Ok(bytes) => return Ok(bytes),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(ResourceError::Io {
                        path: path.to_string(),
                        source,
                    });
                }
            }
        }
        Self::bundled(path)
            .map(|css| css.as_bytes().to_vec())
            .ok_or_else(|| ResourceError::NotFound {
                path: path.to_string(),
            })
    }
}

/// An engine wired to syntect: bundled themes, class based built-in
/// highlighting and the given settings and resources.
pub fn engine(settings: Box<dyn SettingsSource>, resources: BundledResources) -> MdPopups {
    MdPopups::new(
        settings,
        Box::new(resources),
        Box::new(SyntectSchemeLoader),
        Box::new(ClassedHighlighter),
    )
}

#[cfg(test)]
mod tests {
    use super::{BUNDLED_BASE_CSS, BundledResources};
    use mdpopups_core::{BASE_CSS, ResourceError, ResourceLoader};
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn bundled_stylesheets_are_served() {
        let resources = BundledResources::new();
        assert_eq!(resources.load_text(BASE_CSS).ok().as_deref(), Some(BUNDLED_BASE_CSS));
        assert!(matches!(
            resources.load_text("Packages/User/mdpopups.css"),
            Err(ResourceError::NotFound { .. })
        ));
    }

    #[test]
    fn packages_dir_overrides_bundled_files() -> Result<(), Box<dyn std::error::Error>> {
        let stamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
        let dir = std::env::temp_dir().join(format!("mdpopups-res-{}", stamp));
        fs::create_dir_all(dir.join("User"))?;
        fs::write(dir.join("User/mdpopups.css"), "a { color: red; }")?;

        let resources = BundledResources::with_packages_dir(&dir);
        assert_eq!(resources.load_text("Packages/User/mdpopups.css")?, "a { color: red; }");
        assert_eq!(resources.load_text(BASE_CSS)?, BUNDLED_BASE_CSS);

        fs::remove_dir_all(&dir)?;
        Ok(())
    }
}
