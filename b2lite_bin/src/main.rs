use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io;
use std::io::prelude::*;
use std::path::{Path, PathBuf};

const VERSION: &str = env!("CARGO_PKG_VERSION");

const USAGE: &str = "
Usage: b2lite [options] [<inputs>...]
       b2lite (--help | --version)

Options:
    -l, --length=<bytes>    The digest length, from 1 to 64 [default: 64].
    --key=<hex>             A key of up to 64 bytes, hex-encoded.
    --salt=<hex>            A salt of up to 16 bytes, hex-encoded.
    --personal=<hex>        A personalization of up to 16 bytes, hex-encoded.
    -h, --help              Show this message.
    --version               Show the version.
";

#[derive(Debug, Deserialize)]
struct Args {
    arg_inputs: Vec<PathBuf>,
    flag_length: usize,
    flag_key: Option<String>,
    flag_salt: Option<String>,
    flag_personal: Option<String>,
    flag_help: bool,
    flag_version: bool,
}

fn main() -> Result<()> {
    let args: Args = docopt::Docopt::new(USAGE)
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());

    if args.flag_help {
        print!("{}", USAGE);
    } else if args.flag_version {
        println!("{}", VERSION);
    } else {
        let params = params_from_args(&args)?;
        hash(&args, &params)?;
    }

    Ok(())
}

fn decode_hex_flag(name: &str, value: &Option<String>) -> Result<Vec<u8>> {
    match value {
        Some(s) => hex::decode(s).with_context(|| format!("--{} is not valid hex", name)),
        None => Ok(Vec::new()),
    }
}

fn params_from_args(args: &Args) -> Result<b2lite::Params> {
    let key = decode_hex_flag("key", &args.flag_key)?;
    let salt = decode_hex_flag("salt", &args.flag_salt)?;
    let personal = decode_hex_flag("personal", &args.flag_personal)?;
    if args.flag_key.is_some() && key.is_empty() {
        bail!("--key must not be empty");
    }
    let mut params = b2lite::Params::new();
    params
        .hash_length(args.flag_length)
        .key(&key)
        .salt(&salt)
        .personal(&personal);
    // Surface bad lengths before touching any input.
    params.to_state()?;
    Ok(params)
}

fn hash_one(maybe_path: &Option<PathBuf>, params: &b2lite::Params) -> Result<b2lite::Hash> {
    let mut input = open_input(maybe_path)?;
    if let Some(map) = maybe_memmap_input(&input)? {
        Ok(params.hash(&map)?)
    } else {
        let mut state = params.to_state()?;
        b2lite::copy::copy_wide(&mut input, &mut state)?;
        Ok(state.finalize()?)
    }
}

fn hash(args: &Args, params: &b2lite::Params) -> Result<()> {
    if !args.arg_inputs.is_empty() {
        let mut did_error = false;
        for input in args.arg_inputs.iter() {
            let input_str = input.to_string_lossy();
            // As with b2sum or sha1sum, the multi-arg hash loop prints errors and keeps going.
            // This is more convenient for the user in cases like `b2lite *`, where it's common
            // that some of the inputs will error on read e.g. because they're directories.
            match hash_one(&Some(input.clone()), params) {
                Ok(hash) => {
                    if args.arg_inputs.len() > 1 {
                        println!("{}  {}", hash.to_hex(), input_str);
                    } else {
                        println!("{}", hash.to_hex());
                    }
                }
                Err(e) => {
                    did_error = true;
                    eprintln!("b2lite: {}: {:#}", input_str, e);
                }
            }
        }
        if did_error {
            std::process::exit(1);
        }
    } else {
        let hash = hash_one(&None, params)?;
        println!("{}", hash.to_hex());
    }
    Ok(())
}

fn open_input(maybe_path: &Option<PathBuf>) -> Result<Input> {
    Ok(
        if let Some(ref path) = path_if_some_and_not_dash(maybe_path) {
            Input::File(File::open(path)?)
        } else {
            Input::Stdin
        },
    )
}

enum Input {
    Stdin,
    File(File),
}

impl Read for Input {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match *self {
            Input::Stdin => io::stdin().read(buf),
            Input::File(ref mut file) => file.read(buf),
        }
    }
}

fn path_if_some_and_not_dash(maybe_path: &Option<PathBuf>) -> Option<&Path> {
    if let Some(ref path) = maybe_path {
        if path == Path::new("-") {
            None
        } else {
            Some(path)
        }
    } else {
        None
    }
}

fn maybe_memmap_input(input: &Input) -> Result<Option<memmap::Mmap>> {
    let in_file = match *input {
        Input::Stdin => return Ok(None),
        Input::File(ref file) => file,
    };
    let metadata = in_file.metadata()?;
    Ok(if !metadata.is_file() {
        // Not a real file.
        None
    } else if metadata.len() > isize::max_value() as u64 {
        // Too long to safely map. https://github.com/danburkert/memmap-rs/issues/69
        None
    } else if metadata.len() == 0 {
        // Mapping an empty file currently fails. https://github.com/danburkert/memmap-rs/issues/72
        None
    } else {
        // Explicitly set the length of the memory map, so that filesystem changes can't race to
        // violate the invariants we just checked.
        let map = unsafe {
            memmap::MmapOptions::new()
                .len(metadata.len() as usize)
                .map(&in_file)?
        };
        Some(map)
    })
}
