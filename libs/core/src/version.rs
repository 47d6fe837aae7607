use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use failure_derive::Fail;

/// A release version like `1.20` or `1.20.5`.
///
/// Versions order by their numeric components, so `1.9.4 < 1.10`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct MinecraftVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32
}
impl MinecraftVersion {
    #[inline]
    pub const fn new(major: u32, minor: u32, patch: u32) -> MinecraftVersion {
        MinecraftVersion { major, minor, patch }
    }
    /// Whether mapping from `self` to `target` goes back in time.
    #[inline]
    pub fn is_backwards(self, target: MinecraftVersion) -> bool {
        self > target
    }
}
impl FromStr for MinecraftVersion {
    type Err = InvalidMinecraftVersion;

    fn from_str(s: &str) -> Result<Self, InvalidMinecraftVersion> {
        let mut parts = s.split('.');
        let error = || InvalidMinecraftVersion(s.into());
        let major = parts.next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(error)?;
        let minor = parts.next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(error)?;
        let patch = match parts.next() {
            Some(s) => s.parse().ok().ok_or_else(error)?,
            None => 0
        };
        if parts.next().is_some() {
            return Err(error())
        }
        Ok(MinecraftVersion { major, minor, patch })
    }
}
impl Display for MinecraftVersion {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if self.patch != 0 {
            write!(f, ".{}", self.patch)?;
        }
        Ok(())
    }
}
#[derive(Debug, Fail)]
#[fail(display = "Invalid minecraft version {:?}", _0)]
pub struct InvalidMinecraftVersion(pub String);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_versions() {
        assert_eq!(MinecraftVersion::new(1, 20, 0), "1.20".parse().unwrap());
        assert_eq!(MinecraftVersion::new(1, 20, 5), "1.20.5".parse().unwrap());
        assert!("1.20.5.1".parse::<MinecraftVersion>().is_err());
        assert!("3D_Shareware".parse::<MinecraftVersion>().is_err());
        assert!("1".parse::<MinecraftVersion>().is_err());
    }
    #[test]
    fn display_versions() {
        assert_eq!(format!("{}", MinecraftVersion::new(1, 13, 0)), "1.13");
        assert_eq!(format!("{}", MinecraftVersion::new(1, 9, 4)), "1.9.4");
    }
    #[test]
    fn ordering() {
        let v194: MinecraftVersion = "1.9.4".parse().unwrap();
        let v110: MinecraftVersion = "1.10".parse().unwrap();
        assert!(v194 < v110);
        assert!(v110.is_backwards(v194));
        assert!(!v194.is_backwards(v110));
    }
}
