use clap::Subcommand;

use elements_wallet::{ChainSource, DEFAULT_FEE_SAT, Wallet};
use simplicityhl::elements::Address;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the confidential and unconfidential receive addresses
    Address,
    /// Sync with the explorer and print the balance per asset
    Balance,
    /// Pay the policy asset: build, blind and sign a PSET spending every UTXO
    Send {
        /// Recipient confidential address
        #[arg(long = "to-address")]
        to_address: Address,
        /// Amount to send to the recipient in satoshis
        #[arg(long = "send-sats")]
        amount: u64,
        /// Fee in satoshis. A separate explicit fee output is added.
        #[arg(long = "fee-sats", default_value_t = DEFAULT_FEE_SAT)]
        fee: u64,
        /// When set, finalize and broadcast instead of printing the signed PSET
        #[arg(long = "broadcast")]
        broadcast: bool,
    },
    /// Add this wallet's signatures to a base64 PSET
    Sign {
        /// Blinded PSET, base64
        pset: String,
    },
    /// Finalize a fully signed base64 PSET and broadcast it
    Broadcast {
        /// Signed PSET, base64
        pset: String,
    },
}

impl Command {
    /// # Errors
    /// Returns the first wallet or explorer failure.
    pub fn handle(self, mut wallet: Wallet, source: &impl ChainSource) -> anyhow::Result<()> {
        match self {
            Command::Address => {
                println!("Confidential Address: {}", wallet.address()?);
                println!("Unconfidential Address: {}", wallet.unconfidential_address()?);
                println!("Blinding Public Key: {}", wallet.blinding_public_key());
            }
            Command::Balance => {
                wallet.sync(source)?;

                for (asset, value) in wallet.balance()? {
                    println!("{asset}: {value}");
                }
            }
            Command::Send {
                to_address,
                amount,
                fee,
                broadcast,
            } => {
                wallet.sync(source)?;

                let pset = wallet.create_pset(&to_address, wallet.network().policy_asset, amount, fee)?;
                let pset = wallet.blind_pset(&pset)?;
                let pset = wallet.sign_pset(&pset)?;

                if broadcast {
                    println!("Broadcasted txid: {}", wallet.send_pset(&pset, source)?);
                } else {
                    println!("{pset}");
                }
            }
            Command::Sign { pset } => {
                wallet.sync(source)?;

                println!("{}", wallet.sign_pset(&pset)?);
            }
            Command::Broadcast { pset } => {
                println!("Broadcasted txid: {}", wallet.send_pset(&pset, source)?);
            }
        }

        Ok(())
    }
}
