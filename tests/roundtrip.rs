//! File-level round trips through real image files on disk.

use std::fs;
use std::path::{Path, PathBuf};

use image::{ColorType, ImageFormat};
use lsbvault::{decode_file, encode_file, run_batch, BatchJob, NoopHook, StegConfig};

fn cfg(depth: u8) -> StegConfig {
    StegConfig {
        lsb_depth: depth,
        kdf_iterations: 1_000,
        ..Default::default()
    }
}

fn write_cover(dir: &Path, name: &str, size: u32, color: ColorType, format: ImageFormat) -> PathBuf {
    let channels = color.channel_count() as usize;
    let pixels: Vec<u8> = (0..size as usize * size as usize * channels)
        .map(|i| (i * 31 % 253) as u8)
        .collect();
    let path = dir.join(name);
    image::save_buffer_with_format(&path, &pixels, size, size, color, format).unwrap();
    path
}

fn write_payload(dir: &Path, name: &str, len: usize) -> (PathBuf, Vec<u8>) {
    let data: Vec<u8> = (0..len).map(|i| (i * 7 + 3) as u8).collect();
    let path = dir.join(name);
    fs::write(&path, &data).unwrap();
    (path, data)
}

#[test]
fn png_roundtrip_every_depth() {
    let dir = tempfile::tempdir().unwrap();
    let cover = write_cover(dir.path(), "cover.png", 64, ColorType::Rgb8, ImageFormat::Png);
    let (payload, data) = write_payload(dir.path(), "notes.txt", 1000);

    for depth in 1..=3u8 {
        let stego = dir.path().join(format!("stego{}.png", depth));
        encode_file(&cover, &payload, &stego, None, &cfg(depth), &NoopHook).unwrap();

        let out_dir = dir.path().join(format!("out{}", depth));
        let written = decode_file(&stego, &out_dir, None, &cfg(3), &NoopHook).unwrap();
        assert_eq!(written, out_dir.join("notes.txt"));
        assert_eq!(fs::read(&written).unwrap(), data);
    }
}

#[test]
fn encrypted_rgba_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let cover = write_cover(dir.path(), "cover.png", 48, ColorType::Rgba8, ImageFormat::Png);
    let (payload, data) = write_payload(dir.path(), "secret.bin", 1500);
    let stego = dir.path().join("stego.png");

    encode_file(&cover, &payload, &stego, Some("correct horse"), &cfg(2), &NoopHook).unwrap();
    let loaded = lsbvault::raster::io::load(&stego).unwrap();
    assert_eq!(loaded.channels(), 4);

    let out_dir = dir.path().join("out");
    let written = decode_file(&stego, &out_dir, Some("correct horse"), &cfg(2), &NoopHook).unwrap();
    assert_eq!(fs::read(written).unwrap(), data);
}

#[test]
fn encrypted_decode_needs_right_password() {
    let dir = tempfile::tempdir().unwrap();
    let cover = write_cover(dir.path(), "cover.png", 48, ColorType::Rgb8, ImageFormat::Png);
    let (payload, data) = write_payload(dir.path(), "secret.bin", 100);
    let stego = dir.path().join("stego.png");
    encode_file(&cover, &payload, &stego, Some("right"), &cfg(3), &NoopHook).unwrap();

    let out_dir = dir.path().join("out");
    let err = decode_file(&stego, &out_dir, None, &cfg(3), &NoopHook).unwrap_err();
    assert!(format!("{:#}", err).contains("no password"));

    // Without an authentication tag a wrong key passes the padding check
    // about 1 time in 256; it still must not reproduce the plaintext.
    match decode_file(&stego, &out_dir, Some("wrong"), &cfg(3), &NoopHook) {
        Err(err) => {
            assert!(format!("{:#}", err).contains("decryption failed"));
            assert!(!out_dir.join("secret.bin").exists());
        }
        Ok(written) => assert_ne!(fs::read(written).unwrap(), data),
    }
}

#[test]
fn bmp_cover_produces_png() {
    let dir = tempfile::tempdir().unwrap();
    let cover = write_cover(dir.path(), "cover.bmp", 40, ColorType::Rgb8, ImageFormat::Bmp);
    let (payload, data) = write_payload(dir.path(), "a.txt", 300);
    let stego = dir.path().join("stego.bmp");

    encode_file(&cover, &payload, &stego, None, &cfg(1), &NoopHook).unwrap();
    assert_eq!(
        lsbvault::raster::io::detect_format(&stego).unwrap(),
        Some(ImageFormat::Png)
    );

    let written = decode_file(&stego, dir.path(), None, &cfg(1), &NoopHook).unwrap();
    assert_eq!(fs::read(written).unwrap(), data);
}

#[test]
fn capacity_failure_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();
    // 64x64 RGB at depth 1 holds 1536 bytes; 5000 + 277 will not fit.
    let cover = write_cover(dir.path(), "cover.png", 64, ColorType::Rgb8, ImageFormat::Png);
    let (payload, _) = write_payload(dir.path(), "big.bin", 5000);
    let stego = dir.path().join("stego.png");

    let err = encode_file(&cover, &payload, &stego, None, &cfg(1), &NoopHook).unwrap_err();
    assert!(format!("{:#}", err).contains("need 5277 bytes, have 1536"));
    assert!(!stego.exists());
    assert!(!dir.path().join("stego.png.partial").exists());
}

#[test]
fn plain_cover_is_not_stego() {
    let dir = tempfile::tempdir().unwrap();
    let cover = write_cover(dir.path(), "cover.png", 32, ColorType::Rgb8, ImageFormat::Png);
    let err = decode_file(&cover, dir.path(), None, &cfg(3), &NoopHook).unwrap_err();
    assert!(format!("{:#}", err).contains("no embedded data"));
}

#[test]
fn batch_encode_then_decode() {
    let dir = tempfile::tempdir().unwrap();
    let (payload, data) = write_payload(dir.path(), "shared.dat", 400);
    let covers: Vec<PathBuf> = (0..4)
        .map(|i| write_cover(dir.path(), &format!("c{}.png", i), 40, ColorType::Rgb8, ImageFormat::Png))
        .collect();

    let mut jobs: Vec<BatchJob> = covers
        .iter()
        .enumerate()
        .map(|(i, cover)| BatchJob::Encode {
            cover: cover.clone(),
            payload: payload.clone(),
            output: dir.path().join(format!("s{}.png", i)),
        })
        .collect();
    jobs.push(BatchJob::Encode {
        cover: dir.path().join("missing.png"),
        payload: payload.clone(),
        output: dir.path().join("never.png"),
    });

    let outcomes = run_batch(&jobs, Some("batch pw"), &cfg(2));
    assert_eq!(outcomes.len(), 5);
    assert!(outcomes[..4].iter().all(|o| o.success));
    assert!(!outcomes[4].success);

    let decode_jobs: Vec<BatchJob> = (0..4)
        .map(|i| BatchJob::Decode {
            stego: dir.path().join(format!("s{}.png", i)),
            output_dir: dir.path().join(format!("d{}", i)),
        })
        .collect();
    let outcomes = run_batch(&decode_jobs, Some("batch pw"), &cfg(2));
    for (i, outcome) in outcomes.iter().enumerate() {
        assert_eq!(outcome.index, i);
        assert!(outcome.success, "{}", outcome.message);
        let recovered = fs::read(dir.path().join(format!("d{}/shared.dat", i))).unwrap();
        assert_eq!(recovered, data);
    }
}

#[test]
fn batch_same_names_do_not_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let (a, b) = (dir.path().join("a"), dir.path().join("b"));
    fs::create_dir_all(&a).unwrap();
    fs::create_dir_all(&b).unwrap();

    // Same cover name and same payload name in two directories.
    let cover_a = write_cover(&a, "x.png", 40, ColorType::Rgb8, ImageFormat::Png);
    let cover_b = write_cover(&b, "x.png", 40, ColorType::Rgb8, ImageFormat::Png);
    fs::write(a.join("notes.txt"), b"AAAA first payload").unwrap();
    fs::write(b.join("notes.txt"), b"BBBB second").unwrap();

    let stego_dir = dir.path().join("stego");
    fs::create_dir_all(&stego_dir).unwrap();
    let shared_output = stego_dir.join("x_stego.png");
    let jobs = vec![
        BatchJob::Encode {
            cover: cover_a,
            payload: a.join("notes.txt"),
            output: shared_output.clone(),
        },
        BatchJob::Encode {
            cover: cover_b,
            payload: b.join("notes.txt"),
            output: shared_output.clone(),
        },
    ];
    let outcomes = run_batch(&jobs, None, &cfg(2));
    assert!(outcomes.iter().all(|o| o.success));
    let renamed = stego_dir.join("x_stego-1.png");
    assert!(shared_output.exists());
    assert!(renamed.exists());
    assert!(outcomes[1].message.contains("x_stego-1.png"));

    let out = dir.path().join("out");
    let jobs = vec![
        BatchJob::Decode {
            stego: shared_output,
            output_dir: out.clone(),
        },
        BatchJob::Decode {
            stego: renamed,
            output_dir: out.clone(),
        },
    ];
    let outcomes = run_batch(&jobs, None, &cfg(2));
    assert!(outcomes.iter().all(|o| o.success));
    assert_ne!(outcomes[0].message, outcomes[1].message);

    assert_eq!(fs::read(out.join("notes.txt")).unwrap(), b"AAAA first payload");
    assert_eq!(fs::read(out.join("notes-1.txt")).unwrap(), b"BBBB second");
    assert_eq!(fs::read_dir(&out).unwrap().count(), 2);
}
