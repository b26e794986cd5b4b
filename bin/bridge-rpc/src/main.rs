#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/bridge-rpc/bridge-rpc/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

#[macro_use]
extern crate tracing;

pub mod cli;
pub mod commands;
pub mod flags;

fn main() {
    use clap::Parser;

    if let Err(err) = cli::Cli::parse().run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}
