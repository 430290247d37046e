//! `anonkit` — CLI driver around the anonymization mappers.
//!
//! One binary, one subcommand per data type, mirroring
//! `examples/original_source/src/anon.c`'s dispatch table. Argument
//! parsing is `clap` (derive) rather than hand-rolled flags, since this is
//! a genuine multi-subcommand binary rather than the teacher's several
//! single-purpose ones.
//!
//! Exit codes: `0` success, `2` argument/usage error (clap's own exit on a
//! parse failure), `3` file/IO error, `4` mapper failure
//! (`PreconditionViolation` / `ResourceExhaustion` / `RandomnessFailure`).

#![forbid(unsafe_code)]

use std::fs;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use anonkit::bounded_int::BoundedIntMapper;
use anonkit::mac::MacMapper;
use anonkit::octets::OctetStringMapper;
use anonkit::parse::{self, parse_i64, parse_ipv4, parse_ipv6, parse_mac, parse_u64};
use anonkit::trie::{IpV4Trie, IpV6Trie};
use anonkit::{AnonError, AnonResult, Key};

#[derive(Parser)]
#[command(name = "anonkit", about = "Deterministic anonymization primitives for network trace data")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Prefix-preserving (and optionally lex-order-preserving) IPv4 anonymization.
    Ipv4(AddrArgs),
    /// Prefix-preserving (and optionally lex-order-preserving) IPv6 anonymization.
    Ipv6(AddrArgs),
    /// MAC address anonymization.
    Mac(PlainArgs),
    /// Signed 64-bit integer anonymization.
    Int64(IntArgs),
    /// Unsigned 64-bit integer anonymization.
    Uint64(IntArgs),
    /// Octet-string anonymization (raw bytes, one string per line).
    Octs(PlainArgs),
    /// Derive and print keys from a file of passphrases, one per line.
    Key(KeyArgs),
    /// Anonymize the source/destination addresses of a raw Ethernet+IPv4 frame.
    ///
    /// A sketch, not a complete pcap rewriter: no pcap-ng, no checksum
    /// recomputation, no IPv6 extension header walking. Anything this
    /// cannot confidently parse is copied through unmodified.
    Pcap(PcapArgs),
}

#[derive(Args)]
struct AddrArgs {
    /// Preserve lexicographic order of the used set (two-pass).
    #[arg(short = 'l', long = "lex")]
    lex: bool,
    /// Derive the key from a passphrase instead of system randomness.
    #[arg(short = 'p', long = "passphrase")]
    passphrase: Option<String>,
    /// Print resource-usage and trie-size diagnostics to stderr.
    #[arg(short = 'c', long = "count")]
    count: bool,
    /// File of addresses, one per line.
    file: PathBuf,
}

#[derive(Args)]
struct PlainArgs {
    #[arg(short = 'l', long = "lex")]
    lex: bool,
    #[arg(short = 'p', long = "passphrase")]
    passphrase: Option<String>,
    file: PathBuf,
}

#[derive(Args)]
struct IntArgs {
    /// Lower bound of the mapping range (inclusive).
    #[arg(allow_hyphen_values = true)]
    lower: String,
    /// Upper bound of the mapping range (inclusive).
    #[arg(allow_hyphen_values = true)]
    upper: String,
    #[arg(short = 'l', long = "lex")]
    lex: bool,
    #[arg(short = 'p', long = "passphrase")]
    passphrase: Option<String>,
    file: PathBuf,
}

#[derive(Args)]
struct KeyArgs {
    /// File of passphrases, one per line.
    file: PathBuf,
}

#[derive(Args)]
struct PcapArgs {
    #[arg(short = 'l', long = "lex")]
    lex: bool,
    #[arg(short = 'p', long = "passphrase")]
    passphrase: Option<String>,
    infile: PathBuf,
    outfile: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("anonkit: {err}");
        std::process::exit(exit_code_for(&err));
    }
}

fn exit_code_for(err: &AnonError) -> i32 {
    match err {
        AnonError::Io(_) => 3,
        AnonError::PreconditionViolation(_) | AnonError::ResourceExhaustion(_) | AnonError::RandomnessFailure(_) => 4,
    }
}

fn key_from_passphrase(passphrase: &Option<String>) -> AnonResult<Key> {
    let mut key = Key::new();
    match passphrase {
        Some(p) => key.set_passphrase(p),
        None => key.set_random()?,
    }
    Ok(key)
}

fn read_file(path: &PathBuf) -> AnonResult<String> {
    fs::read_to_string(path).map_err(|e| AnonError::Io(format!("{}: {e}", path.display())))
}

fn run(cli: Cli) -> AnonResult<()> {
    match cli.command {
        Command::Ipv4(args) => run_ipv4(args),
        Command::Ipv6(args) => run_ipv6(args),
        Command::Mac(args) => run_mac(args),
        Command::Int64(args) => run_bounded_int::<i64>(args, parse_i64),
        Command::Uint64(args) => run_bounded_int::<u64>(args, parse_u64),
        Command::Octs(args) => run_octs(args),
        Command::Key(args) => run_key(args),
        Command::Pcap(args) => run_pcap(args),
    }
}

fn run_ipv4(args: AddrArgs) -> AnonResult<()> {
    let text = read_file(&args.file)?;
    let addrs = parse::parse_lines(&text, parse_ipv4)?;
    let key = key_from_passphrase(&args.passphrase)?;
    let mut trie = IpV4Trie::new();
    trie.set_key(&key);

    let outputs = if args.lex {
        for a in &addrs {
            trie.set_used(a, 32)?;
        }
        addrs.iter().map(|a| trie.map_pref_lex(a)).collect::<AnonResult<Vec<_>>>()?
    } else {
        addrs.iter().map(|a| trie.map_pref(a)).collect::<AnonResult<Vec<_>>>()?
    };

    for out in &outputs {
        println!("{}", Ipv4Addr::from(*out));
    }
    if args.count {
        eprintln!("anonkit: number of addresses:\t{}", outputs.len());
        eprintln!("anonkit: number of tree nodes:\t{}", trie.nodes_count());
    }
    Ok(())
}

fn run_ipv6(args: AddrArgs) -> AnonResult<()> {
    let text = read_file(&args.file)?;
    let addrs = parse::parse_lines(&text, parse_ipv6)?;
    let key = key_from_passphrase(&args.passphrase)?;
    let mut trie = IpV6Trie::new();
    trie.set_key(&key);

    let outputs = if args.lex {
        for a in &addrs {
            trie.set_used(a, 128)?;
        }
        addrs.iter().map(|a| trie.map_pref_lex(a)).collect::<AnonResult<Vec<_>>>()?
    } else {
        addrs.iter().map(|a| trie.map_pref(a)).collect::<AnonResult<Vec<_>>>()?
    };

    for out in &outputs {
        println!("{}", Ipv6Addr::from(*out));
    }
    if args.count {
        eprintln!("anonkit: number of addresses:\t{}", outputs.len());
        eprintln!("anonkit: number of tree nodes:\t{}", trie.nodes_count());
    }
    Ok(())
}

fn run_mac(args: PlainArgs) -> AnonResult<()> {
    let text = read_file(&args.file)?;
    let macs = parse::parse_lines(&text, parse_mac)?;
    let key = key_from_passphrase(&args.passphrase)?;
    let mut mapper = MacMapper::new()?;
    mapper.set_key(&key);

    if args.lex {
        for m in &macs {
            mapper.set_used(*m)?;
        }
        for m in &macs {
            println!("{}", format_mac(mapper.map_lex(*m)?));
        }
    } else {
        for m in &macs {
            println!("{}", format_mac(mapper.map(*m)?));
        }
    }
    Ok(())
}

fn format_mac(mac: [u8; 6]) -> String {
    mac.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(":")
}

fn run_bounded_int<T>(args: IntArgs, parse_one: fn(&str) -> AnonResult<T>) -> AnonResult<()>
where
    T: anonkit::bounded_int::BoundedValue + std::fmt::Display,
{
    let lower = parse_one(&args.lower)?;
    let upper = parse_one(&args.upper)?;
    let text = read_file(&args.file)?;
    let values = parse::parse_lines(&text, parse_one)?;
    let key = key_from_passphrase(&args.passphrase)?;
    let mut mapper = BoundedIntMapper::new(lower, upper)?;
    mapper.set_key(&key);

    if args.lex {
        for v in &values {
            mapper.set_used(*v)?;
        }
        for v in &values {
            println!("{}", mapper.map_lex(*v)?);
        }
    } else {
        for v in &values {
            println!("{}", mapper.map(*v)?);
        }
    }
    Ok(())
}

fn run_octs(args: PlainArgs) -> AnonResult<()> {
    use std::io::Write;

    let text = read_file(&args.file)?;
    let octs = parse::parse_octet_lines(&text);
    let key = key_from_passphrase(&args.passphrase)?;
    let mut mapper = OctetStringMapper::new();
    mapper.set_key(&key);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut write_line = |bytes: &[u8]| -> AnonResult<()> {
        out.write_all(bytes).and_then(|_| out.write_all(b"\n")).map_err(|e| AnonError::Io(e.to_string()))
    };

    if args.lex {
        for o in &octs {
            mapper.set_used(o)?;
        }
        for o in &octs {
            write_line(&mapper.map_lex(o)?)?;
        }
    } else {
        for o in &octs {
            write_line(&mapper.map(o)?)?;
        }
    }
    Ok(())
}

fn run_key(args: KeyArgs) -> AnonResult<()> {
    let text = read_file(&args.file)?;
    for line in text.lines() {
        if line.is_empty() {
            continue;
        }
        let mut key = Key::new();
        key.set_passphrase(line);
        println!("{}", hex::encode(key.as_bytes()));
    }
    Ok(())
}

/// Minimal Ethernet + IPv4 header walk: anonymize the source/destination
/// address fields of a single raw frame, copying everything else through
/// unmodified. Not a pcap-file reader: no global/record header, no
/// pcap-ng, no checksum recomputation.
fn run_pcap(args: PcapArgs) -> AnonResult<()> {
    const ETH_HDR_LEN: usize = 14;
    const ETHERTYPE_IPV4: [u8; 2] = [0x08, 0x00];
    const IPV4_SRC_OFFSET: usize = ETH_HDR_LEN + 12;
    const IPV4_DST_OFFSET: usize = ETH_HDR_LEN + 16;

    let mut frame =
        fs::read(&args.infile).map_err(|e| AnonError::Io(format!("{}: {e}", args.infile.display())))?;
    let key = key_from_passphrase(&args.passphrase)?;
    let mut trie = IpV4Trie::new();
    trie.set_key(&key);

    let is_ipv4_frame = frame.len() >= IPV4_DST_OFFSET + 4
        && frame[12..14] == ETHERTYPE_IPV4
        && (frame[ETH_HDR_LEN] >> 4) == 4;

    if is_ipv4_frame {
        let mut src = [0u8; 4];
        let mut dst = [0u8; 4];
        src.copy_from_slice(&frame[IPV4_SRC_OFFSET..IPV4_SRC_OFFSET + 4]);
        dst.copy_from_slice(&frame[IPV4_DST_OFFSET..IPV4_DST_OFFSET + 4]);

        let (anon_src, anon_dst) = if args.lex {
            trie.set_used(&src, 32)?;
            trie.set_used(&dst, 32)?;
            (trie.map_pref_lex(&src)?, trie.map_pref_lex(&dst)?)
        } else {
            (trie.map_pref(&src)?, trie.map_pref(&dst)?)
        };

        frame[IPV4_SRC_OFFSET..IPV4_SRC_OFFSET + 4].copy_from_slice(&anon_src);
        frame[IPV4_DST_OFFSET..IPV4_DST_OFFSET + 4].copy_from_slice(&anon_dst);
    } else {
        eprintln!("anonkit: frame is not a parseable Ethernet/IPv4 frame, copying through unmodified");
    }

    fs::write(&args.outfile, &frame).map_err(|e| AnonError::Io(format!("{}: {e}", args.outfile.display())))?;
    Ok(())
}
