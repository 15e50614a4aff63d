use clap::Parser;
use data_encoding::HEXLOWER;
use log::error;
use serde::Serialize;
use std::process;
use utxo_ledger::{
    address_to_pub_key_hash, convert_address, hash_pub_key, validate_address, Block, Command,
    Config, Ledger, LedgerError, Opt, ProofOfWork, Result, Transaction, Wallets,
};

fn main() {
    let opt = Opt::parse();

    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };
    if let Some(data_dir) = opt.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(wallet_file) = opt.wallet_file {
        config.wallet_file = wallet_file;
    }

    env_logger::builder()
        .parse_filters(&config.log_level)
        .init();

    if let Err(e) = run_command(opt.command, &config) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Createblockchain { address } => {
            let pub_key_hash = address_to_pub_key_hash(&address)?;
            Ledger::init_at(&config.data_dir, &pub_key_hash)?;
            println!("Done!");
        }
        Command::Createwallet => {
            let mut wallets = Wallets::load(&config.wallet_file)?;
            let address = wallets.create_wallet()?;
            println!("Your new address: {address}")
        }
        Command::GetBalance { address } => {
            let pub_key_hash = address_to_pub_key_hash(&address)?;
            let ledger = Ledger::open_at(&config.data_dir)?;
            let balance = ledger.get_balance(&pub_key_hash)?;
            println!("Balance of {address}: {balance}");
        }
        Command::ListAddresses => {
            let wallets = Wallets::load(&config.wallet_file)?;
            for address in wallets.get_addresses() {
                println!("{address}")
            }
        }
        Command::Send { from, to, amount } => {
            if !validate_address(&from) {
                return Err(LedgerError::InvalidAddress(from));
            }
            let to_pub_key_hash = address_to_pub_key_hash(&to)?;

            let wallets = Wallets::load(&config.wallet_file)?;
            let wallet = wallets.get_wallet(&from).ok_or_else(|| {
                LedgerError::Wallet(format!("No local wallet for address {from}"))
            })?;

            let mut ledger = Ledger::open_at(&config.data_dir)?;
            let transaction = Transaction::new_transfer(wallet, &to_pub_key_hash, amount, &ledger)?;
            ledger.add_block(&[transaction])?;
            println!("Success!")
        }
        Command::Printchain { json } => {
            let ledger = Ledger::open_at(&config.data_dir)?;
            for block in ledger.iterator() {
                let block = block?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&BlockView::from(&block))?);
                } else {
                    print_block(&block);
                }
            }
        }
    }
    Ok(())
}

fn print_block(block: &Block) {
    println!("Prev. hash: {}", HEXLOWER.encode(block.get_prev_hash()));
    println!("Hash: {}", HEXLOWER.encode(block.get_hash()));
    println!("Nonce: {}", block.get_nonce());
    println!("PoW: {}", ProofOfWork::validate(block));
    for tx in block.get_transactions() {
        println!("{tx}");
    }
    println!()
}

#[derive(Serialize)]
struct BlockView {
    hash: String,
    prev_hash: String,
    nonce: u64,
    pow: bool,
    transactions: Vec<TransactionView>,
}

#[derive(Serialize)]
struct TransactionView {
    id: String,
    coinbase: bool,
    inputs: Vec<InputView>,
    outputs: Vec<OutputView>,
}

#[derive(Serialize)]
struct InputView {
    prev_tx_id: String,
    output_index: i32,
    from: Option<String>,
}

#[derive(Serialize)]
struct OutputView {
    value: u64,
    to: String,
}

impl From<&Block> for BlockView {
    fn from(block: &Block) -> Self {
        BlockView {
            hash: HEXLOWER.encode(block.get_hash()),
            prev_hash: HEXLOWER.encode(block.get_prev_hash()),
            nonce: block.get_nonce(),
            pow: ProofOfWork::validate(block),
            transactions: block
                .get_transactions()
                .iter()
                .map(TransactionView::from)
                .collect(),
        }
    }
}

impl From<&Transaction> for TransactionView {
    fn from(tx: &Transaction) -> Self {
        let coinbase = tx.is_coinbase();
        TransactionView {
            id: HEXLOWER.encode(tx.get_id()),
            coinbase,
            inputs: tx
                .get_inputs()
                .iter()
                .map(|input| InputView {
                    prev_tx_id: HEXLOWER.encode(input.get_prev_tx_id()),
                    output_index: input.get_output_index(),
                    // the coinbase pubkey field holds a memo, not a key
                    from: (!coinbase)
                        .then(|| convert_address(hash_pub_key(input.get_pub_key()).as_slice())),
                })
                .collect(),
            outputs: tx
                .get_outputs()
                .iter()
                .map(|output| OutputView {
                    value: output.get_value(),
                    to: convert_address(output.get_pub_key_hash()),
                })
                .collect(),
        }
    }
}
