//! Create a directory on a FAT32 volume image.

use std::env;
use std::process;

use fatvol::Volume;

fn usage(program: &str) -> ! {
    eprintln!("usage: {} --disk <image> --path <directory>", program);
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
    volume.create_dir(&path).unwrap_or_else(|e| fail(e));
    volume.close().unwrap_or_else(|e| fail(e));
}
