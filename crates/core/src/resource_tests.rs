// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    sata_disk        = { "/dev/sdc",              "/dev/sdc" },
    sata_partition   = { "/dev/sdc1",             "/dev/sdc" },
    sata_double      = { "/dev/sdab12",           "/dev/sdab" },
    virtio_partition = { "/dev/vda3",             "/dev/vda" },
    xen_partition    = { "/dev/xvdb1",            "/dev/xvdb" },
    nvme_disk        = { "/dev/nvme0n1",          "/dev/nvme0n1" },
    nvme_partition   = { "/dev/nvme0n1p2",        "/dev/nvme0n1" },
    mmc_partition    = { "/dev/mmcblk0p1",        "/dev/mmcblk0" },
    loop_partition   = { "/dev/loop3p1",          "/dev/loop3" },
    md_array         = { "/dev/md0",              "/dev/md0" },
    mapper           = { "/dev/mapper/cryptroot", "/dev/mapper/cryptroot" },
    by_id            = { "/dev/disk/by-id/usb-1", "/dev/disk/by-id/usb-1" },
)]
fn device_collapses_to_whole_disk(input: &str, expected: &str) {
    assert_eq!(ResourceId::for_device(input).as_str(), expected);
}

#[yare::parameterized(
    plain          = { "/mnt/backup/img",    "/mnt/backup/img" },
    trailing_slash = { "/mnt/backup/",       "/mnt/backup" },
    dot_segments   = { "/mnt/./backup//img", "/mnt/backup/img" },
    root           = { "/",                  "/" },
)]
fn path_is_normalized(input: &str, expected: &str) {
    assert_eq!(ResourceId::for_path(input).as_str(), expected);
}

#[test]
fn from_location_dispatches_on_dev_prefix() {
    assert!(ResourceId::from_location("/dev/sda2").is_device());
    assert_eq!(ResourceId::from_location("/dev/sda2").as_str(), "/dev/sda");
    assert!(!ResourceId::from_location("/srv/images/a.img").is_device());
}

#[test]
fn dedup_keeps_first_seen_order() {
    let targets = dedup_targets([
        ResourceId::for_device("/dev/sdb1"),
        ResourceId::for_device("/dev/sda"),
        ResourceId::for_device("/dev/sdb2"),
    ]);
    let names: Vec<&str> = targets.iter().map(|t| t.as_str()).collect();
    assert_eq!(names, vec!["/dev/sdb", "/dev/sda"]);
}
