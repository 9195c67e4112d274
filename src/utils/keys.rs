use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use std::fmt;

/// Object-store key for a published asset: `[folder/]<random id>.<ext>`.
///
/// The id is 32 bytes from the thread-local CSPRNG, encoded as unpadded
/// URL-safe base64, so keys are unguessable and never collide in practice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishKey {
    folder: Option<String>,
    id: String,
    extension: String,
}

impl PublishKey {
    pub fn generate(folder: Option<&str>, extension: &str) -> Self {
        Self {
            folder: folder.map(str::to_owned),
            id: random_id(),
            extension: extension.trim_start_matches('.').to_lowercase(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for PublishKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(folder) = &self.folder {
            write!(f, "{}/", folder)?;
        }
        write!(f, "{}.{}", self.id, self.extension)
    }
}

fn random_id() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
