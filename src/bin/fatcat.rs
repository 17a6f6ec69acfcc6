//! Print a file from a FAT32 volume image to stdout.

use std::env;
use std::io::{self, Write};
use std::process;

use fatvol::Volume;

fn usage(program: &str) -> ! {
    eprintln!("usage: {} --disk <image> --path <file>", program);
    process::exit(2);
}

fn fail(err: fatvol::FsError) -> ! {
    eprintln!("error: {}", err);
    process::exit(1);
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let mut disk = None;
    let mut path = None;

    let mut i = 1;
    while i + 1 < args.len() {
        match args[i].as_str() {
            "--disk" => disk = Some(args[i + 1].clone()),
            "--path" => path = Some(args[i + 1].clone()),
            _ => usage(&args[0]),
        }
        i += 2;
    }
    let (disk, path) = match (disk, path) {
        (Some(d), Some(p)) => (d, p),
        _ => usage(&args[0]),
    };

    let mut volume = Volume::open(&disk).unwrap_or_else(|e| fail(e));
    let mut file = volume.read_file(&path).unwrap_or_else(|e| fail(e));
    let bytes_read = volume.read_all(&mut file).unwrap_or_else(|e| fail(e));

    if bytes_read == 0 {
        eprintln!("=> read in 0 bytes");
    } else {
        eprintln!("=> read in {} bytes", bytes_read);
        if let Err(err) = io::stdout().write_all(&file.content) {
            eprintln!("error: write {}: {}", path, err);
            process::exit(1);
        }
    }

    volume.close().unwrap_or_else(|e| fail(e));
}
