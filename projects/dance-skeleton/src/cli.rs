use clap::Parser;
use std::net::IpAddr;
use std::str::FromStr;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to bind to
    #[arg(long, default_value_t = 8000)]
    pub port: u16,

    /// Directory holding uploaded videos while they are processed
    #[arg(long, env = "DANCE_SKELETON_UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: String,

    /// Directory holding the side-by-side outputs
    #[arg(long, env = "DANCE_SKELETON_PROCESSED_DIR", default_value = "processed")]
    pub processed_dir: String,

    /// Local pose model file (downloads the default RTMO weights when omitted)
    #[arg(long, env = "DANCE_SKELETON_MODEL_PATH")]
    pub model_path: Option<String>,

    /// Largest accepted upload, in megabytes
    #[arg(long, env = "DANCE_SKELETON_MAX_UPLOAD_MB", default_value_t = 1024)]
    pub max_upload_mb: usize,

    /// Four character codec code used for the output video
    #[arg(long, env = "DANCE_SKELETON_CODEC", default_value = "avc1")]
    pub codec: FourCc,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// A video codec identifier such as `avc1` or `mp4v`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FourCc(pub [char; 4]);

impl FromStr for FourCc {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let chars: Vec<char> = s.chars().collect();
        match chars.as_slice() {
            [a, b, c, d] if chars.iter().all(|c| c.is_ascii()) => Ok(Self([*a, *b, *c, *d])),
            _ => Err(format!(
                "codec must be exactly four ASCII characters, got '{}'",
                s
            )),
        }
    }
}

impl std::fmt::Display for FourCc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.iter().try_for_each(|c| write!(f, "{}", c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourcc_parsing() {
        let codec: FourCc = "avc1".parse().unwrap();
        assert_eq!(codec.0, ['a', 'v', 'c', '1']);
        assert_eq!(codec.to_string(), "avc1");

        assert!("mp4".parse::<FourCc>().is_err());
        assert!("h2645".parse::<FourCc>().is_err());
        assert!("äbcd".parse::<FourCc>().is_err());
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["dance-skeleton"]);
        assert_eq!(args.port, 8000);
        assert_eq!(args.host.to_string(), "0.0.0.0");
    }
}
