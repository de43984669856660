use thiserror::Error;

/// Exit status for a successful run (including "left unchanged")
pub const EXIT_SUCCESS: u8 = 0;
/// Exit status for a command line that could not be parsed
pub const EXIT_ARGS: u8 = 1;
pub const EXIT_USER: u8 = 2;
pub const EXIT_NO_IMAGES: u8 = 3;
/// Anything unexpected, including history that could not be loaded or saved
pub const EXIT_CRASH: u8 = 9;

/// Failures the user can fix themselves. Everything else travels as
/// `anyhow::Error` and ends up as [`EXIT_CRASH`].
#[derive(Debug, Error)]
pub enum RotateError {
    #[error("please configure at least one path containing wallpapers using `wallroll config --paths`")]
    NoPathsConfigured,

    #[error("please specify at least one wallpaper path using `wallroll next --paths`, or configure one permanently using `wallroll config --paths`")]
    EmptyPathList,

    #[error("this path is either invalid or unsupported: {0}")]
    InvalidPath(String),

    #[error("there are no images to choose from")]
    NoImages,

    #[error("cannot execute command because no current wallpaper has been detected")]
    NoCurrentWallpaper,

    #[error("invalid setting: {0}")]
    InvalidSetting(String),
}

impl RotateError {
    pub fn exit_code(&self) -> u8 {
        match self {
            RotateError::NoImages => EXIT_NO_IMAGES,
            RotateError::NoPathsConfigured
            | RotateError::EmptyPathList
            | RotateError::InvalidPath(_)
            | RotateError::NoCurrentWallpaper
            | RotateError::InvalidSetting(_) => EXIT_USER,
        }
    }
}

/// Map an error that reached `main` to the process exit status
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<RotateError>()
        .map(RotateError::exit_code)
        .unwrap_or(EXIT_CRASH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_user_errors_map_to_user_exit() {
        assert_eq!(RotateError::NoPathsConfigured.exit_code(), EXIT_USER);
        assert_eq!(RotateError::InvalidPath("x".into()).exit_code(), EXIT_USER);
        assert_eq!(RotateError::NoImages.exit_code(), EXIT_NO_IMAGES);
    }

    #[test]
    fn test_exit_code_survives_context() {
        let err = Err::<(), _>(RotateError::NoImages)
            .context("selecting next wallpaper")
            .unwrap_err();
        assert_eq!(exit_code_for(&err), EXIT_NO_IMAGES);

        let io = anyhow::anyhow!("disk on fire");
        assert_eq!(exit_code_for(&io), EXIT_CRASH);
    }
}
