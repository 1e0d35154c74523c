// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

fn fake_block(devices: &[(&str, &str, &str, &str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, removable, vendor, model, size) in devices {
        let dev = dir.path().join(name);
        std::fs::create_dir_all(dev.join("device")).unwrap();
        std::fs::write(dev.join("removable"), format!("{removable}\n")).unwrap();
        std::fs::write(dev.join("device/vendor"), format!("{vendor}  \n")).unwrap();
        std::fs::write(dev.join("device/model"), format!("{model}\n")).unwrap();
        std::fs::write(dev.join("size"), format!("{size}\n")).unwrap();
    }
    dir
}

#[test]
fn lists_sysfs_devices_sorted_and_skips_virtual_ones() {
    let dir = fake_block(&[
        ("sdb", "1", "SanDisk", "Ultra", "61071360"),
        ("nvme0n1", "0", "", "Samsung SSD 980", "1953525168"),
        ("loop0", "0", "", "", "0"),
        ("zram0", "0", "", "", "0"),
    ]);
    let devices = SysfsDevices::with_root(dir.path()).devices().unwrap();
    assert_eq!(
        devices,
        vec![
            Device {
                name: "/dev/nvme0n1".into(),
                description: "Samsung SSD 980 1.0 TB".into(),
                is_removable: false,
            },
            Device {
                name: "/dev/sdb".into(),
                description: "SanDisk Ultra 31.3 GB".into(),
                is_removable: true,
            },
        ]
    );
}

#[test]
fn missing_block_dir_is_an_error() {
    let err = SysfsDevices::with_root("/nonexistent/block").devices().unwrap_err();
    assert!(err.to_string().contains("/nonexistent/block"));
}

#[yare::parameterized(
    whole_disk      = { "/dev/sdb",       true },
    partition       = { "/dev/sdb1",      true },
    nvme_partition  = { "/dev/nvme0n1p2", true },
    other_disk      = { "/dev/sdc",       false },
    name_prefix     = { "/dev/sdba",      false },
)]
fn exists_matches_disks_and_partitions(path: &str, expected: bool) {
    let dir = fake_block(&[
        ("sdb", "1", "", "Stick", "100"),
        ("nvme0n1", "0", "", "Disk", "100"),
    ]);
    assert_eq!(SysfsDevices::with_root(dir.path()).exists(path).unwrap(), expected);
}

#[test]
fn root_device_is_read_from_mounts() {
    let mounts = "\
proc /proc proc rw 0 0
/dev/nvme0n1p2 / ext4 rw,relatime 0 0
/dev/nvme0n1p1 /boot/efi vfat rw 0 0
";
    assert_eq!(detect_root_device(mounts).as_deref(), Some("/dev/nvme0n1p2"));
    assert_eq!(detect_root_device("overlay / overlay rw 0 0\n"), None);
}

#[yare::parameterized(
    bytes = { 512,           "512 B" },
    kilo  = { 2_048,         "2.0 KB" },
    giga  = { 8_000_000_000, "8.0 GB" },
)]
fn sizes_are_human_readable(bytes: u64, expected: &str) {
    assert_eq!(human_size(bytes), expected);
}
