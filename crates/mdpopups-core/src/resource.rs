use crate::error::ResourceError;

/// Loads package resources such as stylesheets and color schemes.
///
/// A missing or unreadable resource is an `Err`, never an empty string.
pub trait ResourceLoader {
    fn load_binary(&self, path: &str) -> Result<Vec<u8>, ResourceError>;

    fn load_text(&self, path: &str) -> Result<String, ResourceError> {
        let bytes = self.load_binary(path)?;
        String::from_utf8(bytes).map_err(|_| ResourceError::Encoding {
            path: path.to_string(),
        })
    }
}
