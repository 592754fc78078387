/// What to do when an entry's destination is already occupied by a file or
/// symlink that the archive would otherwise have to write through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ExistingPolicy {
    /// Abort the whole unpack with [`crate::Error::AlreadyExists`].
    #[default]
    Reject,
    /// Remove the existing file or symlink and recreate it from the archive.
    Replace,
}

#[derive(Clone, Debug)]
pub struct UnpackOptions {
    pub existing: ExistingPolicy,
    pub preserve_permissions: bool,
    pub dir_mode: u32,
}

impl Default for UnpackOptions {
    fn default() -> Self {
        Self {
            existing: ExistingPolicy::default(),
            preserve_permissions: true,
            dir_mode: 0o755,
        }
    }
}

impl UnpackOptions {
    pub fn existing(mut self, policy: ExistingPolicy) -> Self {
        self.existing = policy;
        self
    }

    pub fn preserve_permissions(mut self, preserve: bool) -> Self {
        self.preserve_permissions = preserve;
        self
    }

    pub fn dir_mode(mut self, mode: u32) -> Self {
        self.dir_mode = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = UnpackOptions::default();
        assert_eq!(options.existing, ExistingPolicy::Reject);
        assert!(options.preserve_permissions);
        assert_eq!(options.dir_mode, 0o755);
    }

    #[test]
    fn builder_chain() {
        let options = UnpackOptions::default()
            .existing(ExistingPolicy::Replace)
            .preserve_permissions(false)
            .dir_mode(0o700);
        assert_eq!(options.existing, ExistingPolicy::Replace);
        assert!(!options.preserve_permissions);
        assert_eq!(options.dir_mode, 0o700);
    }
}
