use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "utxo-ledger", about = "Single-node UTXO ledger")]
pub struct Opt {
    #[arg(long = "data-dir", global = true, help = "Directory of the block store")]
    pub data_dir: Option<PathBuf>,
    #[arg(long = "wallet-file", global = true, help = "Path of the wallet file")]
    pub wallet_file: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    #[command(name = "createblockchain", about = "Create a new ledger")]
    Createblockchain {
        #[arg(help = "The address to send the genesis subsidy to")]
        address: String,
    },
    #[command(name = "createwallet", about = "Create a new wallet")]
    Createwallet,
    #[command(
        name = "getbalance",
        about = "Get the wallet balance of the target address"
    )]
    GetBalance {
        #[arg(help = "The wallet address")]
        address: String,
    },
    #[command(name = "listaddresses", about = "Print local wallet addresses")]
    ListAddresses,
    #[command(name = "send", about = "Send value between addresses and mine it")]
    Send {
        #[arg(help = "Source wallet address")]
        from: String,
        #[arg(help = "Destination wallet address")]
        to: String,
        #[arg(help = "Amount to send")]
        amount: u64,
    },
    #[command(name = "printchain", about = "Print all blocks from head to genesis")]
    Printchain {
        #[arg(long, help = "Print blocks as JSON")]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_arguments() {
        let opt = Opt::try_parse_from(["utxo-ledger", "send", "from", "to", "30"]).unwrap();
        assert_eq!(
            opt.command,
            Command::Send {
                from: "from".to_string(),
                to: "to".to_string(),
                amount: 30
            }
        );
        assert!(opt.data_dir.is_none());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let opt = Opt::try_parse_from([
            "utxo-ledger",
            "printchain",
            "--json",
            "--data-dir",
            "/tmp/blocks",
        ])
        .unwrap();
        assert_eq!(opt.command, Command::Printchain { json: true });
        assert_eq!(opt.data_dir, Some(PathBuf::from("/tmp/blocks")));
    }

    #[test]
    fn test_rejects_negative_amount() {
        assert!(Opt::try_parse_from(["utxo-ledger", "send", "a", "b", "-5"]).is_err());
    }
}
