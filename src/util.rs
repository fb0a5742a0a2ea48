use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_SEED: u64 = 0x5EED_0001;

/// Accepts `0x`-prefixed hex or plain decimal.
pub fn parse_seed(seed: &str) -> Result<u64> {
    let s = seed.trim();
    let (digits, radix) = match s.get(..2) {
        Some("0x" | "0X") => (&s[2..], 16),
        _ => (s, 10),
    };
    if digits.is_empty() {
        return Err(anyhow!("empty seed '{seed}'"));
    }
    u64::from_str_radix(digits, radix).with_context(|| format!("invalid seed '{s}'"))
}

pub fn seed_to_hex(seed: u64) -> String {
    format!("0x{seed:08x}")
}

/// Spreads a match seed into per-seat seeds so neighbouring seats do not
/// share RNG streams.
pub fn derive_seed(seed: u64, salt: u64) -> u64 {
    let mut z = seed ^ salt.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Where a benchmark takes its match seeds from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SeedSource {
    /// One seed per line; blank lines and `#` comments are skipped.
    File(PathBuf),
    /// Comma-separated seeds.
    List(String),
    /// `start` followed by `count - 1` seeds derived from it.
    Stream { start: u64, count: u32 },
}

impl SeedSource {
    pub fn resolve(&self) -> Result<Vec<u64>> {
        match self {
            SeedSource::File(path) => {
                let data = fs::read_to_string(path)
                    .with_context(|| format!("failed reading seed file {}", path.display()))?;
                let tokens = data
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.starts_with('#'));
                collect_seeds(tokens, &path.display().to_string())
            }
            SeedSource::List(csv) => collect_seeds(csv.split(','), "--seeds"),
            SeedSource::Stream { start, count } => Ok((0..u64::from(*count))
                .map(|i| if i == 0 { *start } else { derive_seed(*start, i) })
                .collect()),
        }
    }
}

fn collect_seeds<'a>(tokens: impl Iterator<Item = &'a str>, origin: &str) -> Result<Vec<u64>> {
    let seeds = tokens
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(parse_seed)
        .collect::<Result<Vec<_>>>()?;
    if seeds.is_empty() {
        return Err(anyhow!("no seeds found in {origin}"));
    }
    Ok(seeds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_parse_from_hex_and_decimal() -> Result<()> {
        assert_eq!(parse_seed("0x1F")?, 31);
        assert_eq!(parse_seed(" 42 ")?, 42);
        assert!(parse_seed("0xZZ").is_err());
        assert!(parse_seed("0x").is_err());
        assert_eq!(seed_to_hex(255), "0x000000ff");
        Ok(())
    }

    #[test]
    fn seed_lists_skip_blank_entries() -> Result<()> {
        assert_eq!(SeedSource::List("1, ,0x10".into()).resolve()?, vec![1, 16]);
        assert!(SeedSource::List(" , ".into()).resolve().is_err());
        Ok(())
    }

    #[test]
    fn seed_file_skips_comments() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("seeds.txt");
        fs::write(&path, "# warmup\n7\n\n0xa\n")?;
        assert_eq!(SeedSource::File(path).resolve()?, vec![7, 10]);
        Ok(())
    }

    #[test]
    fn seed_stream_starts_at_its_start() -> Result<()> {
        let seeds = SeedSource::Stream { start: 9, count: 4 }.resolve()?;
        assert_eq!(seeds.len(), 4);
        assert_eq!(seeds[0], 9);
        assert_eq!(seeds[1], derive_seed(9, 1));
        assert!(SeedSource::Stream { start: 9, count: 0 }.resolve()?.is_empty());
        Ok(())
    }

    #[test]
    fn derived_seeds_differ_per_salt() {
        assert_ne!(derive_seed(5, 0), derive_seed(5, 1));
        assert_eq!(derive_seed(5, 3), derive_seed(5, 3));
    }
}
