//! End-to-end runs of the index pipeline over synthetic GeoTIFF tiles.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use raster_io::{
    DataType, GeoTiffDriver, GeoTransform, RasterDriver, RasterGrid, RasterProfile,
};
use spectral_indices::{IndexBatch, PipelineSettings, RunReport};
use storage::{ObjectStorage, RemoteArchive, StorageError, StorageResult};
use test_utils::{
    all_band_files, assert_approx_eq, band_file_name, constant_band, synthetic_band,
    TileWorkspace, TILE_ORIGIN, TILE_PREFIX, UTM35N_EPSG,
};
use tile_common::Epsg;

const SIZE_10M: usize = 8;

fn band_profile(resolution_m: u32) -> RasterProfile {
    let size = SIZE_10M * 10 / resolution_m as usize;
    RasterProfile::new(size, size)
        .with_transform(GeoTransform::north_up(
            TILE_ORIGIN.0,
            TILE_ORIGIN.1,
            resolution_m as f64,
            resolution_m as f64,
        ))
        .with_crs(Epsg::new(UTM35N_EPSG))
        .with_data_type(DataType::UInt16)
}

fn write_band(dir: &Path, prefix: &str, resolution_m: u32, code: &str, values: Vec<f32>) {
    let profile = band_profile(resolution_m);
    let grid = RasterGrid::new(values, profile.width, profile.height).unwrap();
    GeoTiffDriver::new()
        .write(&dir.join(band_file_name(prefix, resolution_m, code)), &grid, &profile)
        .unwrap();
}

/// A complete synthetic tile, optionally without some bands.
fn write_tile(ws: &TileWorkspace, name: &str, prefix: &str, skip: &[(u32, &str)]) -> PathBuf {
    let dir = ws.tile_dir(name).unwrap();
    for (res, code) in all_band_files() {
        if skip.contains(&(res, code)) {
            continue;
        }
        let size = SIZE_10M * 10 / res as usize;
        write_band(&dir, prefix, res, code, synthetic_band(code, size, size));
    }
    dir
}

fn batch(output: &Path) -> IndexBatch {
    IndexBatch::new(
        &PipelineSettings::default(),
        Arc::new(GeoTiffDriver::new()),
        output,
    )
    .unwrap()
    .with_max_concurrency(4)
}

async fn run(batch: &IndexBatch, dirs: &[PathBuf], indices: &[&str]) -> RunReport {
    let indices: Vec<String> = indices.iter().map(|s| s.to_string()).collect();
    let items = batch.plan(dirs, &indices).unwrap();
    batch.run(items).await
}

#[tokio::test]
async fn test_ndvi_output_path_values_and_georeference() {
    let ws = TileWorkspace::new().unwrap();
    let tile = write_tile(&ws, "tileA", TILE_PREFIX, &[]);
    let output = ws.output_dir();

    let report = run(&batch(&output), &[tile.clone()], &["ndvi"]).await;
    assert!(report.is_success(), "{}", report.failure_listing());

    let expected_path = output.join("ndvi").join(format!("{}_ndvi.tif", TILE_PREFIX));
    assert!(expected_path.is_file());

    let driver = GeoTiffDriver::new();
    let (grid, profile) = driver.read(&expected_path).unwrap();
    let red = synthetic_band("04", SIZE_10M, SIZE_10M);
    let nir = synthetic_band("08", SIZE_10M, SIZE_10M);
    for i in 0..grid.len() {
        let (r, n) = (red[i] / 10000.0, nir[i] / 10000.0);
        assert_approx_eq!(grid.data()[i], (n - r) / (n + r), 1e-6);
    }

    let reference = driver
        .read_profile(&tile.join(band_file_name(TILE_PREFIX, 10, "04")))
        .unwrap();
    assert_eq!(profile.crs, reference.crs);
    assert_eq!(profile.transform, reference.transform);
    assert_eq!(profile.data_type, DataType::Float32);
    assert_eq!(profile.compression, raster_io::Compression::Lzw);
}

#[tokio::test]
async fn test_zero_reflectance_gives_nan() {
    let ws = TileWorkspace::new().unwrap();
    let dir = ws.tile_dir("dark").unwrap();
    let n = SIZE_10M * SIZE_10M;
    write_band(&dir, TILE_PREFIX, 10, "04", constant_band(SIZE_10M, SIZE_10M, 0));
    write_band(&dir, TILE_PREFIX, 10, "08", constant_band(SIZE_10M, SIZE_10M, 0));
    let output = ws.output_dir();

    let report = run(&batch(&output), &[dir], &["ndvi"]).await;
    assert!(report.is_success());

    let (grid, _) = GeoTiffDriver::new()
        .read(&output.join("ndvi").join(format!("{}_ndvi.tif", TILE_PREFIX)))
        .unwrap();
    assert_eq!(grid.nan_count(), n);
}

#[tokio::test]
async fn test_twenty_metre_index_uses_twenty_metre_grid() {
    let ws = TileWorkspace::new().unwrap();
    let tile = write_tile(&ws, "tileA", TILE_PREFIX, &[]);
    let output = ws.output_dir();

    let report = run(&batch(&output), &[tile], &["nbr", "tctw"]).await;
    assert!(report.is_success(), "{}", report.failure_listing());

    let profile = GeoTiffDriver::new()
        .read_profile(&output.join("nbr").join(format!("{}_nbr.tif", TILE_PREFIX)))
        .unwrap();
    assert_eq!(profile.shape(), (SIZE_10M / 2, SIZE_10M / 2));
    assert_eq!(profile.transform.pixel_size(), (20.0, 20.0));
    assert!(output.join("tctw").join(format!("{}_tctw.tif", TILE_PREFIX)).is_file());
}

#[tokio::test]
async fn test_missing_band_fails_only_its_item() {
    let ws = TileWorkspace::new().unwrap();
    let complete = write_tile(&ws, "complete", "A_20230601_20230630", &[]);
    let partial = write_tile(&ws, "partial", "B_20230601_20230630", &[(10, "08")]);
    let output = ws.output_dir();

    let report = run(&batch(&output), &[complete, partial.clone()], &["ndvi", "ndmi"]).await;

    assert_eq!(report.total(), 4);
    assert_eq!(report.succeeded(), 3);
    assert!(!report.is_success());

    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].item, format!("{} :: ndvi", partial.display()));
    assert!(report.failure_listing().contains("B08@10m not found"));

    assert!(output.join("ndvi/A_20230601_20230630_ndvi.tif").is_file());
    assert!(output.join("ndmi/B_20230601_20230630_ndmi.tif").is_file());
    assert!(!output.join("ndvi/B_20230601_20230630_ndvi.tif").exists());
}

#[tokio::test]
async fn test_missing_directory_is_an_item_failure() {
    let ws = TileWorkspace::new().unwrap();
    let tile = write_tile(&ws, "tileA", TILE_PREFIX, &[]);
    let missing = ws.root().join("input/nowhere");

    let report = run(&batch(&ws.output_dir()), &[tile, missing], &["dvi"]).await;
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failures().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_directories_sharing_a_prefix_write_concurrently() {
    let ws = TileWorkspace::new().unwrap();
    let dirs: Vec<PathBuf> = (0..16)
        .map(|i| write_tile(&ws, &format!("copy{:02}", i), TILE_PREFIX, &[]))
        .collect();
    let output = ws.output_dir();

    let batch = batch(&output).with_max_concurrency(8);
    let report = run(&batch, &dirs, &["ndvi"]).await;

    assert_eq!(report.total(), 16);
    assert!(report.is_success(), "{}", report.failure_listing());

    let index_dir = output.join("ndvi");
    let entries: Vec<String> = fs::read_dir(&index_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries, vec![format!("{}_ndvi.tif", TILE_PREFIX)]);

    let (grid, _) = GeoTiffDriver::new()
        .read(&index_dir.join(&entries[0]))
        .unwrap();
    assert_eq!(grid.shape(), (SIZE_10M, SIZE_10M));
    assert_eq!(grid.nan_count(), 0);
}

#[tokio::test]
async fn test_rerun_is_bit_identical() {
    let ws = TileWorkspace::new().unwrap();
    let tile = write_tile(&ws, "tileA", TILE_PREFIX, &[]);
    let output = ws.output_dir();
    let path = output.join("kndvi").join(format!("{}_kndvi.tif", TILE_PREFIX));
    let batch = batch(&output);

    assert!(run(&batch, &[tile.clone()], &["kndvi"]).await.is_success());
    let first = fs::read(&path).unwrap();
    assert!(run(&batch, &[tile], &["kndvi"]).await.is_success());
    let second = fs::read(&path).unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_all_indices_on_one_tile() {
    let ws = TileWorkspace::new().unwrap();
    let tile = write_tile(&ws, "tileA", TILE_PREFIX, &[]);
    let output = ws.output_dir();
    let names = spectral_indices::IndexRegistry::global().names();

    let report = run(&batch(&output), &[tile], &names).await;
    assert!(report.is_success(), "{}", report.failure_listing());
    for name in names {
        assert!(output.join(name).join(format!("{}_{}.tif", TILE_PREFIX, name)).is_file());
    }
}

/// Fails every upload whose key starts with `fail_prefix`.
struct FlakyArchive {
    store: Arc<InMemory>,
    inner: ObjectStorage,
    fail_prefix: &'static str,
}

impl FlakyArchive {
    async fn stored(&self, key: &str) -> bool {
        self.store.head(&ObjectPath::from(key)).await.is_ok()
    }
}

#[async_trait]
impl RemoteArchive for FlakyArchive {
    async fn upload_file(&self, local: &Path, key: &str) -> StorageResult<u64> {
        if key.starts_with(self.fail_prefix) {
            return Err(StorageError::request(key, "simulated outage"));
        }
        self.inner.upload_file(local, key).await
    }

    fn location(&self, key: &str) -> String {
        self.inner.location(key)
    }
}

fn flaky_archive(fail_prefix: &'static str) -> Arc<FlakyArchive> {
    let store = Arc::new(InMemory::new());
    Arc::new(FlakyArchive {
        inner: ObjectStorage::with_store(store.clone(), "mosaicbucket"),
        store,
        fail_prefix,
    })
}

#[tokio::test]
async fn test_archive_uploads_then_removes_local_copy() {
    let ws = TileWorkspace::new().unwrap();
    let tile = write_tile(&ws, "tileA", TILE_PREFIX, &[]);
    let output = ws.output_dir();
    let archive = flaky_archive("never/");

    let batch = batch(&output).with_archive(archive.clone());
    let report = run(&batch, &[tile], &["ndvi"]).await;
    assert!(report.is_success(), "{}", report.failure_listing());

    let key = format!("ndvi/20230601_20230630/{}_ndvi.tif", TILE_PREFIX);
    assert!(archive.stored(&key).await);
    assert!(!output.join("ndvi").join(format!("{}_ndvi.tif", TILE_PREFIX)).exists());
    assert_eq!(
        report.outcomes[0].status,
        spectral_indices::ItemStatus::Succeeded {
            output: format!("s3://mosaicbucket/{}", key)
        }
    );
}

#[tokio::test]
async fn test_failed_upload_keeps_local_file_and_fails_item() {
    let ws = TileWorkspace::new().unwrap();
    let tile = write_tile(&ws, "tileA", TILE_PREFIX, &[]);
    let output = ws.output_dir();
    let archive = flaky_archive("ndwi/");

    let batch = batch(&output).with_archive(archive.clone());
    let report = run(&batch, &[tile], &["ndvi", "ndwi"]).await;

    assert_eq!(report.succeeded(), 1);
    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].item.ends_with(":: ndwi"));

    // The failed item's raster stays on disk, the successful one was moved.
    assert!(output.join("ndwi").join(format!("{}_ndwi.tif", TILE_PREFIX)).is_file());
    assert!(!output.join("ndvi").join(format!("{}_ndvi.tif", TILE_PREFIX)).exists());
    let ndwi_key = format!("ndwi/20230601_20230630/{}_ndwi.tif", TILE_PREFIX);
    assert!(!archive.stored(&ndwi_key).await);
    assert!(archive.stored(&format!("ndvi/20230601_20230630/{}_ndvi.tif", TILE_PREFIX)).await);
}

#[tokio::test]
async fn test_archiving_without_timeframe_keeps_local_file() {
    let ws = TileWorkspace::new().unwrap();
    let tile = write_tile(&ws, "undated", "T35VLG_mosaic", &[]);
    let output = ws.output_dir();

    let batch = batch(&output).with_archive(flaky_archive("never/"));
    let report = run(&batch, &[tile], &["dvi"]).await;

    assert!(!report.is_success());
    assert!(report.failure_listing().contains("no timeframe token"));
    assert!(output.join("dvi/T35VLG_mosaic_dvi.tif").is_file());
}
