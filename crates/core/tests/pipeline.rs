use stampname_core::{
    apply_plan, generate_plan, CollisionPolicy, FailureKind, PlacementAction, PlanOptions,
    RelatedNaming,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// JPEG holding only an APP1 block with DateTimeOriginal and, optionally, SubSecTimeOriginal.
fn jpeg(datetime: &str, subsec: Option<&str>) -> Vec<u8> {
    let mut entries: Vec<(u16, Vec<u8>)> = vec![(0x9003, nul_terminated(datetime))];
    if let Some(subsec) = subsec {
        entries.push((0x9291, nul_terminated(subsec)));
    }

    let exif_ifd = 8 + 18u32;
    let mut data_offset = exif_ifd + 2 + 12 * entries.len() as u32 + 4;
    let mut tiff = b"MM\0\x2a".to_vec();
    tiff.extend_from_slice(&8u32.to_be_bytes());
    tiff.extend_from_slice(&1u16.to_be_bytes());
    tiff.extend_from_slice(&0x8769u16.to_be_bytes());
    tiff.extend_from_slice(&4u16.to_be_bytes());
    tiff.extend_from_slice(&1u32.to_be_bytes());
    tiff.extend_from_slice(&exif_ifd.to_be_bytes());
    tiff.extend_from_slice(&0u32.to_be_bytes());

    let mut data = Vec::new();
    tiff.extend_from_slice(&(entries.len() as u16).to_be_bytes());
    for (tag, bytes) in &entries {
        tiff.extend_from_slice(&tag.to_be_bytes());
        tiff.extend_from_slice(&2u16.to_be_bytes());
        tiff.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        if bytes.len() <= 4 {
            let mut inline = [0u8; 4];
            inline[..bytes.len()].copy_from_slice(bytes);
            tiff.extend_from_slice(&inline);
        } else {
            tiff.extend_from_slice(&data_offset.to_be_bytes());
            data.extend_from_slice(bytes);
            data_offset += bytes.len() as u32;
        }
    }
    tiff.extend_from_slice(&0u32.to_be_bytes());
    tiff.extend_from_slice(&data);

    let mut out = vec![0xff, 0xd8, 0xff, 0xe1];
    out.extend_from_slice(&((tiff.len() + 8) as u16).to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&[0xff, 0xd9]);
    out
}

fn nul_terminated(value: &str) -> Vec<u8> {
    let mut bytes = value.as_bytes().to_vec();
    bytes.push(0);
    bytes
}

fn names_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read dir")
        .flatten()
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

fn options(inputs: Vec<PathBuf>, target: &Path) -> PlanOptions {
    PlanOptions {
        inputs,
        target: target.to_path_buf(),
        ..PlanOptions::default()
    }
}

#[test]
fn related_raw_is_copied_under_the_same_timestamp() {
    let temp = tempdir().expect("tempdir");
    let src = temp.path().join("src");
    let out = temp.path().join("out");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("IMG_0001.JPG"), jpeg("2023:05:01 10:20:30", Some("500"))).unwrap();
    fs::write(src.join("IMG_0001.CR2"), b"raw sensor data").unwrap();

    let plan = generate_plan(&PlanOptions {
        related: true,
        action: PlacementAction::Copy,
        ..options(vec![src.clone()], &out)
    })
    .expect("plan");
    let result = apply_plan(&plan);

    assert_eq!(result.placed, 2);
    assert!(result.failures.is_empty());
    assert_eq!(
        names_in(&out),
        vec!["20230501_102030_500.cr2", "20230501_102030_500.jpg"]
    );
    assert_eq!(
        fs::read(out.join("20230501_102030_500.cr2")).unwrap(),
        b"raw sensor data"
    );
    assert!(src.join("IMG_0001.CR2").exists(), "copy keeps the source");
}

#[test]
fn keep_related_names_moves_sibling_under_its_own_stem() {
    let temp = tempdir().expect("tempdir");
    let src = temp.path().join("src");
    let out = temp.path().join("out");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("IMG_0001.JPG"), jpeg("2023:05:01 10:20:30", Some("500"))).unwrap();
    fs::write(src.join("IMG_0001.CR2"), b"raw").unwrap();

    let plan = generate_plan(&PlanOptions {
        related: true,
        related_naming: RelatedNaming::KeepOriginal,
        action: PlacementAction::Move,
        ..options(vec![src.clone()], &out)
    })
    .expect("plan");
    let result = apply_plan(&plan);

    assert_eq!(result.placed, 2);
    assert_eq!(names_in(&out), vec!["20230501_102030_500.jpg", "IMG_0001.cr2"]);
    assert!(names_in(&src).is_empty());
}

#[test]
fn file_without_metadata_is_reported_and_batch_continues() {
    let temp = tempdir().expect("tempdir");
    let src = temp.path().join("src");
    let out = temp.path().join("out");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("IMG_0002.JPG"), [0xffu8, 0xd8, 0xff, 0xd9]).unwrap();
    fs::write(src.join("IMG_0003.JPG"), jpeg("2023:05:01 10:20:31", None)).unwrap();

    let plan = generate_plan(&PlanOptions {
        action: PlacementAction::Copy,
        ..options(vec![src.clone()], &out)
    })
    .expect("plan");
    assert_eq!(plan.failures.len(), 1);
    assert_eq!(plan.failures[0].kind, FailureKind::MetadataUnavailable);
    assert_eq!(plan.failures[0].path, src.join("IMG_0002.JPG"));

    let result = apply_plan(&plan);
    assert_eq!(result.placed, 1);
    assert_eq!(names_in(&out), vec!["20230501_102031_000.jpg"]);
}

#[test]
fn existing_destination_gets_first_free_suffix() {
    let temp = tempdir().expect("tempdir");
    let out = temp.path().join("out");
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("20230501_102030_500.jpg"), b"earlier").unwrap();
    let photo = temp.path().join("IMG_0001.JPG");
    fs::write(&photo, jpeg("2023:05:01 10:20:30", Some("500"))).unwrap();

    let opts = PlanOptions {
        collision: CollisionPolicy::Suffix,
        action: PlacementAction::Copy,
        ..options(vec![photo.clone()], &out)
    };
    let result = apply_plan(&generate_plan(&opts).expect("plan"));
    assert_eq!(result.placed, 1);
    assert!(out.join("20230501_102030_500_1.jpg").exists());

    let result = apply_plan(&generate_plan(&opts).expect("plan"));
    assert_eq!(result.placed, 1);
    assert!(out.join("20230501_102030_500_2.jpg").exists());
    assert_eq!(
        fs::read(out.join("20230501_102030_500.jpg")).unwrap(),
        b"earlier"
    );
}

#[test]
fn overwrite_runs_are_idempotent() {
    let temp = tempdir().expect("tempdir");
    let out = temp.path().join("out");
    let photo = temp.path().join("IMG_0001.JPG");
    let bytes = jpeg("2023:05:01 10:20:30", Some("500"));
    fs::write(&photo, &bytes).unwrap();

    let opts = PlanOptions {
        collision: CollisionPolicy::Overwrite,
        action: PlacementAction::Copy,
        ..options(vec![photo.clone()], &out)
    };
    for _ in 0..2 {
        let result = apply_plan(&generate_plan(&opts).expect("plan"));
        assert_eq!(result.placed, 1);
        assert!(result.failures.is_empty());
        assert_eq!(names_in(&out), vec!["20230501_102030_500.jpg"]);
        assert_eq!(fs::read(out.join("20230501_102030_500.jpg")).unwrap(), bytes);
    }
}

#[test]
fn second_run_without_overwrite_or_suffixes_skips() {
    let temp = tempdir().expect("tempdir");
    let out = temp.path().join("out");
    let photo = temp.path().join("IMG_0001.JPG");
    let bytes = jpeg("2023:05:01 10:20:30", Some("500"));
    fs::write(&photo, &bytes).unwrap();

    let opts = PlanOptions {
        action: PlacementAction::Copy,
        ..options(vec![photo.clone()], &out)
    };
    assert_eq!(apply_plan(&generate_plan(&opts).expect("plan")).placed, 1);

    fs::write(&photo, b"changed source").unwrap();
    let plan = generate_plan(&opts).expect("plan");
    assert!(plan.placements.is_empty());
    assert_eq!(plan.failures.len(), 1);
    assert_eq!(plan.failures[0].kind, FailureKind::DestinationConflict);
    assert_eq!(fs::read(out.join("20230501_102030_500.jpg")).unwrap(), bytes);
}

#[test]
fn modtime_fallback_places_file_without_metadata() {
    let temp = tempdir().expect("tempdir");
    let out = temp.path().join("out");
    let photo = temp.path().join("IMG_0002.JPG");
    fs::write(&photo, [0xffu8, 0xd8, 0xff, 0xd9]).unwrap();

    let plan = generate_plan(&PlanOptions {
        use_modtime: true,
        action: PlacementAction::Hardlink,
        ..options(vec![photo.clone()], &out)
    })
    .expect("plan");
    assert!(plan.failures.is_empty());
    let result = apply_plan(&plan);
    assert_eq!(result.placed, 1);

    let placed = names_in(&out);
    assert_eq!(placed.len(), 1);
    assert!(placed[0].ends_with("_000.jpg"), "{}", placed[0]);
}

#[test]
fn overwrite_in_place_keeps_the_only_copy() {
    for action in [
        PlacementAction::Copy,
        PlacementAction::Hardlink,
        PlacementAction::Symlink,
        PlacementAction::Move,
    ] {
        let temp = tempdir().expect("tempdir");
        let photo = temp.path().join("20230501_102030_500.jpg");
        let bytes = jpeg("2023:05:01 10:20:30", Some("500"));
        fs::write(&photo, &bytes).unwrap();

        let plan = generate_plan(&PlanOptions {
            collision: CollisionPolicy::Overwrite,
            action,
            ..options(vec![photo.clone()], temp.path())
        })
        .expect("plan");
        assert!(plan.placements.is_empty(), "{action:?}");
        assert_eq!(plan.stats.in_place, 1, "{action:?}");

        let result = apply_plan(&plan);
        assert!(result.failures.is_empty(), "{action:?}");
        let meta = fs::symlink_metadata(&photo).expect("photo still exists");
        assert!(meta.file_type().is_file(), "{action:?}");
        assert_eq!(fs::read(&photo).unwrap(), bytes, "{action:?}");
    }
}

#[test]
fn in_place_file_is_found_through_a_dotted_target() {
    let temp = tempdir().expect("tempdir");
    let photo = temp.path().join("20230501_102030_500.jpg");
    fs::write(&photo, jpeg("2023:05:01 10:20:30", Some("500"))).unwrap();

    // Same directory reached through a different spelling.
    let target = temp.path().join("sub").join("..");
    fs::create_dir_all(temp.path().join("sub")).unwrap();
    let plan = generate_plan(&PlanOptions {
        collision: CollisionPolicy::Overwrite,
        action: PlacementAction::Copy,
        ..options(vec![photo.clone()], &target)
    })
    .expect("plan");
    assert!(plan.placements.is_empty());
    assert!(photo.exists());
}
