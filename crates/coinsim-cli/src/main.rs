//! Interactive front end for the coinsim ledger. All state and logic live
//! in `coinsim-core`; this binary only parses commands and prints results.
use std::io::{self, BufRead, Write};

use anyhow::Result;
use clap::Parser;
use coinsim_core::constants::DEFAULT_DIFFICULTY;
use coinsim_core::Ledger;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "coinsim")]
#[command(about = "Interactive proof-of-work ledger simulator")]
struct Args {
    /// Leading zero hex digits required of every mined block hash
    #[arg(long, default_value_t = DEFAULT_DIFFICULTY)]
    difficulty: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Create {
        name: String,
        balance: i64,
    },
    Send {
        sender: String,
        receiver: String,
        amount: u64,
    },
    Chain,
    Balances,
    Validate,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        ["create", name] => Ok(Command::Create {
            name: (*name).to_string(),
            balance: 0,
        }),
        ["create", name, balance] => {
            let balance = balance
                .parse()
                .map_err(|_| format!("invalid balance: {balance}"))?;
            Ok(Command::Create {
                name: (*name).to_string(),
                balance,
            })
        }
        ["send", sender, receiver, amount] => {
            let amount = amount
                .parse()
                .map_err(|_| format!("invalid amount: {amount}"))?;
            Ok(Command::Send {
                sender: (*sender).to_string(),
                receiver: (*receiver).to_string(),
                amount,
            })
        }
        ["chain"] => Ok(Command::Chain),
        ["balances"] => Ok(Command::Balances),
        ["validate"] => Ok(Command::Validate),
        ["help"] => Ok(Command::Help),
        ["quit"] | ["exit"] => Ok(Command::Quit),
        _ => Err(format!("unknown command: {line} (try 'help')")),
    }
}

/// Runs one command against the ledger. Returns false when the loop should
/// stop.
fn run_command(ledger: &mut Ledger, cmd: Command) -> bool {
    match cmd {
        Command::Create { name, balance } => {
            if ledger.create_account(&name, balance) {
                println!("User '{name}' created with balance {balance}");
            } else {
                println!("User '{name}' already exists!");
            }
        }
        Command::Send {
            sender,
            receiver,
            amount,
        } => match ledger.transfer(&sender, &receiver, amount) {
            Ok(hash) => println!("Transaction added! Block mined: {}", hex::encode(hash)),
            Err(err) => println!("Error: {err}"),
        },
        Command::Chain => {
            println!("=== Blockchain ===");
            for block in ledger.blocks() {
                println!("Index: {}", block.index);
                println!("Data: {}", block.data);
                println!("Hash: {}", hex::encode(block.hash));
                println!("Previous Hash: {}", hex::encode(block.previous_hash));
                println!("Nonce: {}", block.nonce);
                println!("-------------------------------");
            }
        }
        Command::Balances => {
            println!("=== User Balances ===");
            let mut rows: Vec<_> = ledger.balances().iter().collect();
            rows.sort_by(|a, b| a.0.cmp(b.0));
            for (user, balance) in rows {
                println!("{user}: {balance}");
            }
        }
        Command::Validate => {
            if ledger.is_chain_valid() {
                println!("Blockchain is valid!");
            } else {
                println!("Blockchain has been tampered!");
            }
        }
        Command::Help => {
            println!("commands:");
            println!("  create <name> [balance]       register an account");
            println!("  send <from> <to> <amount>     mine a transfer block");
            println!("  chain                         print every block");
            println!("  balances                      print every account");
            println!("  validate                      re-verify the chain");
            println!("  quit                          exit");
        }
        Command::Quit => return false,
    }
    true
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut ledger = Ledger::new(args.difficulty);
    println!(
        "coinsim ledger at difficulty {} - type 'help' for commands",
        args.difficulty
    );

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_command(line) {
            Ok(cmd) => {
                if !run_command(&mut ledger, cmd) {
                    break;
                }
            }
            Err(msg) => println!("{msg}"),
        }
    }
    Ok(())
}
