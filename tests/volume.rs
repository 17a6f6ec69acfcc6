//! End-to-end tests over in-memory FAT32 images.
//!
//! `mkimage` formats a minimal but well-formed volume: boot sector,
//! FSInfo, backup copies of both at sectors 6 and 7, and two FAT copies
//! with the root directory's cluster terminated.

use std::io::Cursor;

use fatvol::lfn::short_name_checksum;
use fatvol::{ErrorKind, FatTable, Volume};

const BPS: usize = 512;

#[derive(Clone, Copy)]
struct Geometry {
    total_sectors: u32,
    sectors_per_cluster: u8,
    reserved: u16,
    /// Sectors per FAT copy.
    fat_size: u32,
}

/// 2 MiB, one sector per cluster.
const SMALL: Geometry =
    Geometry { total_sectors: 4096, sectors_per_cluster: 1, reserved: 32, fat_size: 32 };
/// 4 MiB, 4 KiB clusters.
const MEDIUM: Geometry =
    Geometry { total_sectors: 8192, sectors_per_cluster: 8, reserved: 32, fat_size: 8 };
/// 64 MiB, 4 KiB clusters (scenario S1 geometry).
const BIG: Geometry =
    Geometry { total_sectors: 131072, sectors_per_cluster: 8, reserved: 32, fat_size: 128 };

fn put_u16(buf: &mut [u8], off: usize, v: u16) {
    buf[off..off + 2].copy_from_slice(&v.to_le_bytes());
}

fn put_u32(buf: &mut [u8], off: usize, v: u32) {
    buf[off..off + 4].copy_from_slice(&v.to_le_bytes());
}

/// Free data clusters on a freshly formatted image (root takes one).
fn free_clusters(geom: &Geometry) -> u32 {
    let data_sectors = geom.total_sectors - geom.reserved as u32 - 2 * geom.fat_size;
    data_sectors / geom.sectors_per_cluster as u32 - 1
}

/// Byte offset of a data cluster.
fn cluster_offset(geom: &Geometry, cluster: u32) -> usize {
    (geom.reserved as usize + 2 * geom.fat_size as usize) * BPS
        + (cluster as usize - 2) * geom.sectors_per_cluster as usize * BPS
}

fn fat_offset(geom: &Geometry, copy: u32) -> usize {
    (geom.reserved as usize + copy as usize * geom.fat_size as usize) * BPS
}

fn mkimage(geom: &Geometry) -> Vec<u8> {
    let mut img = vec![0u8; geom.total_sectors as usize * BPS];

    // Boot sector.
    img[0..3].copy_from_slice(&[0xEB, 0x58, 0x90]);
    img[3..11].copy_from_slice(b"MSWIN4.1");
    put_u16(&mut img, 11, BPS as u16);
    img[13] = geom.sectors_per_cluster;
    put_u16(&mut img, 14, geom.reserved);
    img[16] = 2; // FAT copies
    img[21] = 0xF8; // media
    put_u16(&mut img, 24, 63); // sectors per track
    put_u16(&mut img, 26, 255); // heads
    put_u32(&mut img, 32, geom.total_sectors);
    put_u32(&mut img, 36, geom.fat_size);
    put_u32(&mut img, 44, 2); // root cluster
    put_u16(&mut img, 48, 1); // FSInfo sector
    put_u16(&mut img, 50, 6); // backup boot sector
    img[64] = 0x80; // drive number
    img[66] = 0x29; // boot signature
    put_u32(&mut img, 67, 0x1234_5678);
    img[71..82].copy_from_slice(b"TESTVOL    ");
    img[82..90].copy_from_slice(b"FAT32   ");
    img[510] = 0x55;
    img[511] = 0xAA;

    // FSInfo sector.
    let fs = BPS;
    put_u32(&mut img, fs, 0x4161_5252);
    put_u32(&mut img, fs + 484, 0x6141_7272);
    put_u32(&mut img, fs + 488, free_clusters(geom));
    put_u32(&mut img, fs + 492, 3);
    put_u32(&mut img, fs + 508, 0xAA55_0000);

    // Backup boot sector and FSInfo at sectors 6 and 7.
    let (head, tail) = img.split_at_mut(6 * BPS);
    tail[..BPS].copy_from_slice(&head[..BPS]);
    tail[BPS..2 * BPS].copy_from_slice(&head[BPS..2 * BPS]);

    // Both FAT copies: media descriptor, EOC marker, root terminated.
    for copy in 0..2 {
        let off = fat_offset(geom, copy);
        put_u32(&mut img, off, 0x0FFF_FFF8);
        put_u32(&mut img, off + 4, 0x0FFF_FFFF);
        put_u32(&mut img, off + 8, 0x0FFF_FFFF);
    }

    img
}

fn mount(img: Vec<u8>) -> Volume<Cursor<Vec<u8>>> {
    Volume::mount(Cursor::new(img)).expect("mount")
}

#[test]
fn s1_blank_volume_mounts_and_reports_free_space() {
    let mut volume = mount(mkimage(&BIG));

    let err = volume.read_file("/").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::NoFileSpecified));
    assert_eq!(err.to_string(), "read_file /: no file specified");

    let info = volume.info();
    assert_eq!(info.bytes_per_sector, 512);
    assert_eq!(info.sectors_per_cluster, 8);
    assert_eq!(info.volume_label, "TESTVOL");
    assert_eq!(info.fs_type, "FAT32");
    assert_eq!(info.free_clusters, free_clusters(&BIG));
    assert_eq!(info.next_free_cluster, 3);

    assert_eq!(volume.bpb(), volume.backup_bpb());
    assert_eq!(volume.fsinfo(), volume.backup_fsinfo());
}

#[test]
fn s2_create_dir_in_root_updates_accounting() {
    let mut volume = mount(mkimage(&MEDIUM));
    let before = volume.info();

    let created = volume.create_dir("/hello").expect("create_dir");
    assert_eq!(created.name(), "hello");
    assert!(created.is_directory());

    let found = volume.read_file("/hello").expect("read back");
    assert!(found.is_directory());
    assert_eq!(found.size(), 0);
    assert_eq!(found.first_cluster(), 3);

    let info = volume.info();
    assert_eq!(info.free_clusters, before.free_clusters - 1);
    assert_eq!(info.next_free_cluster, 4);
    assert!(volume.fat().is_eoc(volume.fat().get(3)));
}

#[test]
fn s3_long_name_gets_the_full_ldir_group() {
    let name = "WorldIsLong-ümlaut.txt-as-dir";
    let mut volume = mount(mkimage(&MEDIUM));
    volume.create_dir("/hello").expect("parent");
    volume.create_dir(&format!("/hello/{}", name)).expect("child");

    let file = volume.read_file(&format!("/hello/{}", name)).expect("read back");
    assert_eq!(file.name(), name);

    // 29 UTF-16 units plus the terminator, 13 units per entry.
    let utf16_len = name.encode_utf16().count();
    let expected = (utf16_len + 1 + 12) / 13;
    assert_eq!(file.ldir_entries().len(), expected);
    assert_eq!(file.dir_loc() - file.ldir_loc(), expected as u64 * 32);

    let chksum = short_name_checksum(&file.dir_entry().name);
    assert!(file.ldir_entries().iter().all(|e| e.chksum == chksum));
}

#[test]
fn s3_long_name_survives_a_remount() {
    let name = "WorldIsLong-ümlaut.txt-as-dir";
    let mut volume = mount(mkimage(&MEDIUM));
    volume.create_dir("/hello").expect("parent");
    volume.create_dir(&format!("/hello/{}", name)).expect("child");

    let img = volume.into_inner().into_inner();
    let mut volume = mount(img);
    let file = volume.read_file(&format!("/hello/{}", name)).expect("after remount");
    assert_eq!(file.name(), name);
    assert!(file.is_directory());
}

#[test]
fn s4_read_follows_a_non_contiguous_chain() {
    let geom = MEDIUM;
    let mut img = mkimage(&geom);

    // FAT[3] -> 5 -> 7 -> EOC, in both copies.
    for copy in 0..2 {
        let off = fat_offset(&geom, copy);
        put_u32(&mut img, off + 3 * 4, 5);
        put_u32(&mut img, off + 5 * 4, 7);
        put_u32(&mut img, off + 7 * 4, 0x0FFF_FFFF);
    }

    // Root entry: "BIG", 10 KiB starting at cluster 3.
    let size: usize = 10240;
    let root = cluster_offset(&geom, 2);
    img[root..root + 11].copy_from_slice(b"BIG        ");
    img[root + 11] = 0x20; // archive
    put_u16(&mut img, root + 26, 3);
    put_u32(&mut img, root + 28, size as u32);

    // Pattern split 4096 + 4096 + 2048 across clusters 3, 5, 7.
    let pattern: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    let cluster_size = geom.sectors_per_cluster as usize * BPS;
    for (i, chunk) in pattern.chunks(cluster_size).enumerate() {
        let cluster = [3u32, 5, 7][i];
        let off = cluster_offset(&geom, cluster);
        img[off..off + chunk.len()].copy_from_slice(chunk);
    }

    let mut volume = mount(img);
    let mut file = volume.read_file("/BIG").expect("resolve");
    assert_eq!(file.size(), size as u32);

    let n = volume.read_all(&mut file).expect("read_all");
    assert_eq!(n, size);
    assert_eq!(file.content, pattern);

    // A short buffer reads just the head of the chain.
    let mut head = [0u8; 100];
    assert_eq!(volume.read(&file, &mut head).expect("read"), 100);
    assert_eq!(head[..], pattern[..100]);
}

#[test]
fn s5_corrupt_boot_signature_fails_the_mount() {
    let mut img = mkimage(&SMALL);
    img[510] = 0x00;
    let err = Volume::mount(Cursor::new(img)).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidSignature));
}

#[test]
fn s6_corrupt_fsinfo_signature_fails_the_mount() {
    let mut img = mkimage(&SMALL);
    img[BPS] = 0x00; // lead signature of the FSInfo sector
    let err = Volume::mount(Cursor::new(img)).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidFsInfoSignature));
}

#[test]
fn reading_a_directory_is_rejected() {
    let mut volume = mount(mkimage(&MEDIUM));
    volume.create_dir("/logs").expect("create_dir");

    let file = volume.read_file("/logs").expect("resolve");
    let mut buf = [0u8; 16];
    let err = volume.read(&file, &mut buf).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::IsDirectory));
}

#[test]
fn duplicate_create_fails_and_writes_nothing() {
    let mut volume = mount(mkimage(&MEDIUM));
    volume.create_dir("/EXISTS").expect("first create");
    let snapshot = volume.into_inner().into_inner();

    let mut volume = mount(snapshot.clone());
    let err = volume.create_dir("/EXISTS").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::AlreadyExists));
    assert_eq!(volume.into_inner().into_inner(), snapshot);
}

#[test]
fn create_dir_keeps_the_metadata_copies_identical() {
    let geom = MEDIUM;
    let mut volume = mount(mkimage(&geom));
    volume.create_dir("/mirror").expect("create_dir");

    assert_eq!(volume.fat(), volume.backup_fat());
    assert_eq!(volume.fsinfo(), volume.backup_fsinfo());
    let entries = match volume.fat() {
        FatTable::Fat32(t) => t.len(),
        FatTable::Fat16(t) => t.len(),
    };

    // Both FAT copies and both FSInfo sectors are persisted byte-for-byte.
    let img = volume.into_inner().into_inner();
    let primary = &img[fat_offset(&geom, 0)..fat_offset(&geom, 0) + entries * 4];
    let backup = &img[fat_offset(&geom, 1)..fat_offset(&geom, 1) + entries * 4];
    assert_eq!(primary, backup);
    assert_eq!(img[BPS..2 * BPS], img[7 * BPS..8 * BPS]);
}

#[test]
fn new_directory_contains_dot_and_dotdot() {
    let geom = MEDIUM;
    let mut volume = mount(mkimage(&geom));
    volume.create_dir("/FOO").expect("parent"); // cluster 3
    volume.create_dir("/FOO/BAR").expect("child"); // cluster 4

    let bar = volume.read_file("/FOO/BAR").expect("resolve");
    assert!(bar.is_directory());
    assert_eq!(bar.size(), 0);
    assert_eq!(bar.first_cluster(), 4);

    let img = volume.into_inner().into_inner();

    // BAR's cluster: `.` to itself, `..` to FOO, nothing else.
    let off = cluster_offset(&geom, 4);
    assert_eq!(&img[off..off + 11], b".          ");
    assert_eq!(img[off + 11], 0x14); // directory | system
    assert_eq!(u16::from_le_bytes([img[off + 26], img[off + 27]]), 4);
    assert_eq!(&img[off + 32..off + 43], b"..         ");
    assert_eq!(u16::from_le_bytes([img[off + 58], img[off + 59]]), 3);
    assert!(img[off + 64..off + geom.sectors_per_cluster as usize * BPS]
        .iter()
        .all(|&b| b == 0));

    // FOO hangs off the root, so its `..` cluster is 0.
    let off = cluster_offset(&geom, 3);
    assert_eq!(&img[off + 32..off + 43], b"..         ");
    assert_eq!(u16::from_le_bytes([img[off + 58], img[off + 59]]), 0);
    assert_eq!(u16::from_le_bytes([img[off + 52], img[off + 53]]), 0);
}

#[test]
fn create_dir_rejects_bad_paths_and_names() {
    let mut volume = mount(mkimage(&SMALL));

    let err = volume.create_dir("/").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidPath));

    let err = volume.create_dir("/sub/.").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidPath));

    let err = volume.create_dir("/bad:name").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidName));

    let long = format!("/{}", "x".repeat(256));
    let err = volume.create_dir(&long).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::NameTooLong));

    let err = volume.create_dir("/missing/child").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::NotFound));
}

#[test]
fn lookup_misses_report_not_found() {
    let mut volume = mount(mkimage(&MEDIUM));
    volume.create_dir("/present").expect("create_dir");

    let err = volume.read_file("/absent").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::NotFound));
    assert_eq!(err.op(), "read_file");
    assert_eq!(err.path(), "/absent");

    let err = volume.read_file("/present/deeper").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::NotFound));
}
