//! Runtime configuration derived from CLI flags.
//!
//! There is no config-file layer: §6 of the specification defines the CLI
//! exhaustively as this server's configuration surface, so the teacher
//! crate's `config`/`toml`-based file layer is not carried over (see
//! DESIGN.md).

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::cli::Cli;

#[derive(Debug, Clone)]
pub struct Config {
    pub base_asset: String,
    pub quote_asset: String,
    pub levels: usize,
    pub dust_amount: Decimal,
    pub port: u16,
    pub log_level: String,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        let dust_amount = Decimal::from_str(&cli.dust_amount)
            .map_err(|e| anyhow::anyhow!("invalid --dust_amount {:?}: {e}", cli.dust_amount))?;

        Ok(Self {
            base_asset: cli.base_asset.clone(),
            quote_asset: cli.quote_asset.clone(),
            levels: cli.levels,
            dust_amount,
            port: cli.port,
            log_level: cli.log_level.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dust_amount_as_decimal() {
        let cli = Cli::try_parse_from_for_test("btc", "usdt", "0.25");
        let cfg = Config::from_cli(&cli).unwrap();
        assert_eq!(cfg.dust_amount, Decimal::from_str("0.25").unwrap());
    }

    #[test]
    fn rejects_invalid_dust_amount() {
        let cli = Cli::try_parse_from_for_test("btc", "usdt", "not-a-number");
        assert!(Config::from_cli(&cli).is_err());
    }

    impl Cli {
        fn try_parse_from_for_test(base: &str, quote: &str, dust: &str) -> Self {
            use clap::Parser;
            Cli::try_parse_from([
                "ob-aggregator",
                "--base_asset",
                base,
                "--quote_asset",
                quote,
                "--dust_amount",
                dust,
            ])
            .unwrap()
        }
    }
}
