//! Print volume debug information, and file debug information when a
//! path is given.

use std::env;
use std::process;

use fatvol::{File, Volume};

fn usage(program: &str) -> ! {
    eprintln!("usage: {} --disk <image> [--path <file>]", program);
    process::exit(2);
}

fn fail(err: fatvol::FsError) -> ! {
    eprintln!("error: {}", err);
    process::exit(1);
}

fn print_file_info(file: &File) {
    println!("+-------------------+");
    println!("|  FILE DEBUG INFO  |");
    println!("+-------------------+");
    println!("\\ filename  : {}", file.name());
    println!("\\ LDIR loc  : {:08x}", file.ldir_loc());
    println!("\\ DIR loc   : {:08x}", file.dir_loc());
    println!("\\ directory?: {}", file.is_directory());
    println!("\\ cluster   : {}", file.first_cluster());
    println!("\\ file size : {}", file.size());
    println!();
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
    let disk = match disk {
        Some(d) => d,
        None => usage(&args[0]),
    };

    let mut volume = Volume::open(&disk).unwrap_or_else(|e| fail(e));
    println!("{}", volume.info());
    println!();

    if let Some(path) = path {
        let file = volume.read_file(&path).unwrap_or_else(|e| fail(e));
        print_file_info(&file);
    }

    volume.close().unwrap_or_else(|e| fail(e));
}
