//! LDM1 binary model format: parsing, memory-mapped loading, and writers.
//!
//! Wire format (big-endian throughout), magic `0x4C444D31`, version `1`:
//!
//! ```text
//! u32 magic
//! u32 version
//! u32 num_buckets   B
//! u32 num_classes   C
//! repeat C times: u16 len, <len> UTF-8 bytes   ; labels
//! C x f32                                       ; scales
//! C x f32                                       ; biases
//! B*C x i8                                      ; weights, bucket-major
//! [u8 include_trigrams]                         ; optional, 0/1, default 0
//! ```
//!
//! The trailing `include_trigrams` byte is an addition over the base LDM1
//! layout (see DESIGN.md): it lets `Model::create_extractor` reproduce the
//! exact tokenization a model was trained with. Its absence (a read that
//! stops exactly at the end of the weight blob) is treated as `false`.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, FormatReason, Result};
use crate::extractor::FeatureExtractor;

pub const MAGIC: u32 = 0x4C44_4D31;
pub const VERSION: u32 = 1;

/// Either an owned heap buffer or a read-only memory-mapped region holding
/// the `B*C` int8 weight blob. Never both, never neither.
pub enum WeightStorage {
    Heap(Vec<i8>),
    Mapped { mmap: Arc<memmap2::Mmap>, offset: usize, len: usize },
}

impl WeightStorage {
    pub fn as_slice(&self) -> &[i8] {
        match self {
            WeightStorage::Heap(v) => v.as_slice(),
            WeightStorage::Mapped { mmap, offset, len } => {
                let bytes = &mmap[*offset..*offset + *len];
                // SAFETY: i8 and u8 share size and alignment; this only
                // reinterprets the sign of already-initialized bytes.
                unsafe { std::slice::from_raw_parts(bytes.as_ptr() as *const i8, bytes.len()) }
            }
        }
    }
}

/// An immutable, loaded CharSoup model. Safe to share by reference (or via
/// `Arc`) across concurrent detectors; never mutated after construction.
pub struct Model {
    num_buckets: u32,
    num_classes: u32,
    labels: Vec<String>,
    label_index: HashMap<String, u32>,
    scales: Vec<f32>,
    biases: Vec<f32>,
    include_trigrams: bool,
    weights: WeightStorage,
}

struct ParsedMeta {
    num_buckets: u32,
    num_classes: u32,
    labels: Vec<String>,
    label_index: HashMap<String, u32>,
    scales: Vec<f32>,
    biases: Vec<f32>,
    /// Byte offset immediately after the biases array.
    offset: usize,
}

fn read_u32_be(bytes: &[u8], offset: usize) -> Result<u32> {
    let slice = bytes
        .get(offset..offset + 4)
        .ok_or_else(|| Error::format(FormatReason::Truncated))?;
    Ok(u32::from_be_bytes(slice.try_into().unwrap()))
}

fn read_u16_be(bytes: &[u8], offset: usize) -> Result<u16> {
    let slice = bytes
        .get(offset..offset + 2)
        .ok_or_else(|| Error::format(FormatReason::Truncated))?;
    Ok(u16::from_be_bytes(slice.try_into().unwrap()))
}

fn read_f32_be(bytes: &[u8], offset: usize) -> Result<f32> {
    let slice = bytes
        .get(offset..offset + 4)
        .ok_or_else(|| Error::format(FormatReason::Truncated))?;
    Ok(f32::from_be_bytes(slice.try_into().unwrap()))
}

fn parse_meta(bytes: &[u8]) -> Result<ParsedMeta> {
    let magic = read_u32_be(bytes, 0)?;
    if magic != MAGIC {
        return Err(Error::format(FormatReason::BadMagic { found: magic }));
    }
    let version = read_u32_be(bytes, 4)?;
    if version != VERSION {
        return Err(Error::format(FormatReason::UnsupportedVersion { found: version }));
    }
    let num_buckets = read_u32_be(bytes, 8)?;
    let num_classes = read_u32_be(bytes, 12)?;
    if num_buckets == 0 || num_classes == 0 {
        return Err(Error::BadArgument(
            "num_buckets and num_classes must be positive".into(),
        ));
    }

    let mut offset = 16usize;
    // Each label occupies at least a u16 length prefix; reject an untrusted
    // `num_classes` before reserving capacity for it, so a crafted header
    // (e.g. num_classes = 0xFFFFFFFF) can't force a multi-gigabyte
    // allocation ahead of the truncation check that would otherwise catch it.
    let min_remaining = (num_classes as u64).saturating_mul(2);
    if min_remaining > (bytes.len().saturating_sub(offset)) as u64 {
        return Err(Error::format(FormatReason::Truncated));
    }
    let mut labels = Vec::with_capacity(num_classes as usize);
    let mut label_index = HashMap::with_capacity(num_classes as usize);
    for i in 0..num_classes as usize {
        let len = read_u16_be(bytes, offset)? as usize;
        offset += 2;
        let raw = bytes
            .get(offset..offset + len)
            .ok_or_else(|| Error::format(FormatReason::Truncated))?;
        let label = std::str::from_utf8(raw)
            .map_err(|_| Error::format(FormatReason::NonUtf8Label { index: i }))?
            .to_string();
        offset += len;
        if label_index.contains_key(&label) {
            return Err(Error::format(FormatReason::DuplicateLabel { label }));
        }
        label_index.insert(label.clone(), i as u32);
        labels.push(label);
    }

    let mut scales = Vec::with_capacity(num_classes as usize);
    for _ in 0..num_classes {
        scales.push(read_f32_be(bytes, offset)?);
        offset += 4;
    }
    let mut biases = Vec::with_capacity(num_classes as usize);
    for _ in 0..num_classes {
        biases.push(read_f32_be(bytes, offset)?);
        offset += 4;
    }

    Ok(ParsedMeta {
        num_buckets,
        num_classes,
        labels,
        label_index,
        scales,
        biases,
        offset,
    })
}

fn weight_blob_len(meta: &ParsedMeta) -> Result<u64> {
    (meta.num_buckets as u64)
        .checked_mul(meta.num_classes as u64)
        .ok_or_else(|| Error::BadArgument("num_buckets * num_classes overflows".into()))
}

fn trailing_trigrams_flag(bytes: &[u8], offset: usize) -> bool {
    bytes.get(offset).copied() == Some(1)
}

impl Model {
    /// Parse a model from an in-memory LDM1 byte buffer, allocating the
    /// weight blob on the heap.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let meta = parse_meta(bytes)?;
        let blob_len = weight_blob_len(&meta)? as usize;
        let weight_bytes = bytes
            .get(meta.offset..meta.offset + blob_len)
            .ok_or_else(|| Error::format(FormatReason::Truncated))?;
        if weight_bytes.len() != blob_len {
            return Err(Error::format(FormatReason::WeightSizeMismatch {
                expected: blob_len as u64,
                found: weight_bytes.len() as u64,
            }));
        }
        let weights: Vec<i8> = weight_bytes.iter().map(|&b| b as i8).collect();
        let include_trigrams = trailing_trigrams_flag(bytes, meta.offset + blob_len);

        tracing::info!(
            num_buckets = meta.num_buckets,
            num_classes = meta.num_classes,
            include_trigrams,
            "loaded LDM1 model (buffered)"
        );

        Ok(Model {
            num_buckets: meta.num_buckets,
            num_classes: meta.num_classes,
            labels: meta.labels,
            label_index: meta.label_index,
            scales: meta.scales,
            biases: meta.biases,
            include_trigrams,
            weights: WeightStorage::Heap(weights),
        })
    }

    /// Read a complete LDM1 model from any buffered byte source.
    pub fn load_buffered<R: Read>(mut reader: R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    /// Memory-map `path` and retain a read-only mapped view of the weight
    /// blob (zero-copy). Header fields are validated against the mapped
    /// region before the mapping is kept.
    pub fn load_mapped<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        let meta = parse_meta(&mmap)?;
        let blob_len = weight_blob_len(&meta)? as usize;
        if meta.offset + blob_len > mmap.len() {
            return Err(Error::format(FormatReason::Truncated));
        }
        let include_trigrams = trailing_trigrams_flag(&mmap, meta.offset + blob_len);

        tracing::info!(
            num_buckets = meta.num_buckets,
            num_classes = meta.num_classes,
            include_trigrams,
            "loaded LDM1 model (mapped)"
        );

        Ok(Model {
            num_buckets: meta.num_buckets,
            num_classes: meta.num_classes,
            labels: meta.labels,
            label_index: meta.label_index,
            scales: meta.scales,
            biases: meta.biases,
            include_trigrams,
            weights: WeightStorage::Mapped {
                mmap: Arc::new(mmap),
                offset: meta.offset,
                len: blob_len,
            },
        })
    }

    /// Like [`Model::load_mapped`], but copies the weight blob to the heap
    /// and drops the mapping before returning.
    pub fn load_mapped_owned<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        let meta = parse_meta(&mmap)?;
        let blob_len = weight_blob_len(&meta)? as usize;
        let weight_bytes = mmap
            .get(meta.offset..meta.offset + blob_len)
            .ok_or_else(|| Error::format(FormatReason::Truncated))?;
        let weights: Vec<i8> = weight_bytes.iter().map(|&b| b as i8).collect();
        let include_trigrams = trailing_trigrams_flag(&mmap, meta.offset + blob_len);
        drop(mmap);

        Ok(Model {
            num_buckets: meta.num_buckets,
            num_classes: meta.num_classes,
            labels: meta.labels,
            label_index: meta.label_index,
            scales: meta.scales,
            biases: meta.biases,
            include_trigrams,
            weights: WeightStorage::Heap(weights),
        })
    }

    /// Load a split artifact: a raw weight file (directly mappable, exactly
    /// `B*C` bytes) plus a metadata sidecar carrying the LDM1 header,
    /// labels, scales, and biases. A size mismatch releases the mapping
    /// before returning the error.
    pub fn load_split<P: AsRef<Path>>(weights_path: P, meta_path: P) -> Result<Self> {
        let mut meta_bytes = Vec::new();
        File::open(meta_path)?.read_to_end(&mut meta_bytes)?;
        let meta = parse_meta(&meta_bytes)?;
        let include_trigrams = trailing_trigrams_flag(&meta_bytes, meta.offset);
        let expected = weight_blob_len(&meta)?;

        let weight_file = File::open(weights_path)?;
        let mmap = unsafe { memmap2::Mmap::map(&weight_file)? };
        if mmap.len() as u64 != expected {
            // `mmap` drops here, releasing the mapping before we return.
            return Err(Error::format(FormatReason::WeightSizeMismatch {
                expected,
                found: mmap.len() as u64,
            }));
        }

        tracing::info!(
            num_buckets = meta.num_buckets,
            num_classes = meta.num_classes,
            include_trigrams,
            "loaded LDM1 model (split)"
        );

        Ok(Model {
            num_buckets: meta.num_buckets,
            num_classes: meta.num_classes,
            labels: meta.labels,
            label_index: meta.label_index,
            scales: meta.scales,
            biases: meta.biases,
            include_trigrams,
            weights: WeightStorage::Mapped {
                mmap: Arc::new(mmap),
                offset: 0,
                len: expected as usize,
            },
        })
    }

    fn write_meta<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&MAGIC.to_be_bytes())?;
        writer.write_all(&VERSION.to_be_bytes())?;
        writer.write_all(&self.num_buckets.to_be_bytes())?;
        writer.write_all(&self.num_classes.to_be_bytes())?;
        for label in &self.labels {
            let bytes = label.as_bytes();
            if bytes.len() > u16::MAX as usize {
                return Err(Error::format(FormatReason::LabelTooLong {
                    index: 0,
                    len: bytes.len(),
                }));
            }
            writer.write_all(&(bytes.len() as u16).to_be_bytes())?;
            writer.write_all(bytes)?;
        }
        for &s in &self.scales {
            writer.write_all(&s.to_be_bytes())?;
        }
        for &b in &self.biases {
            writer.write_all(&b.to_be_bytes())?;
        }
        Ok(())
    }

    /// Write the single-file LDM1 form. Deterministic; round-trips with
    /// [`Model::from_bytes`] / [`Model::load_buffered`].
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.write_meta(writer)?;
        let weights = self.weights.as_slice();
        let weight_bytes: Vec<u8> = weights.iter().map(|&b| b as u8).collect();
        writer.write_all(&weight_bytes)?;
        writer.write_all(&[self.include_trigrams as u8])?;
        Ok(())
    }

    /// Write the two-file split form: a raw, directly mappable weight file
    /// and a metadata sidecar.
    pub fn save_split<P: AsRef<Path>>(&self, weights_path: P, meta_path: P) -> Result<()> {
        let mut weights_file = File::create(weights_path)?;
        let weights = self.weights.as_slice();
        let weight_bytes: Vec<u8> = weights.iter().map(|&b| b as u8).collect();
        weights_file.write_all(&weight_bytes)?;

        let mut meta_file = File::create(meta_path)?;
        self.write_meta(&mut meta_file)?;
        meta_file.write_all(&[self.include_trigrams as u8])?;
        Ok(())
    }

    /// Build a model from raw parts (used by training-side importers and
    /// tests). Rejects a weight blob whose length isn't exactly `B*C`.
    pub fn from_parts(
        num_buckets: u32,
        labels: Vec<String>,
        scales: Vec<f32>,
        biases: Vec<f32>,
        weights: Vec<i8>,
        include_trigrams: bool,
    ) -> Result<Self> {
        if num_buckets == 0 {
            return Err(Error::BadArgument("num_buckets must be positive".into()));
        }
        let num_classes = labels.len() as u32;
        if num_classes == 0 {
            return Err(Error::BadArgument("num_classes must be positive".into()));
        }
        if scales.len() != labels.len() || biases.len() != labels.len() {
            return Err(Error::BadArgument(
                "scales/biases length must equal num_classes".into(),
            ));
        }
        let expected = num_buckets as u64 * num_classes as u64;
        if weights.len() as u64 != expected {
            return Err(Error::format(FormatReason::WeightSizeMismatch {
                expected,
                found: weights.len() as u64,
            }));
        }
        let mut label_index = HashMap::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            if label_index.contains_key(label) {
                return Err(Error::format(FormatReason::DuplicateLabel {
                    label: label.clone(),
                }));
            }
            label_index.insert(label.clone(), i as u32);
        }
        Ok(Model {
            num_buckets,
            num_classes,
            labels,
            label_index,
            scales,
            biases,
            include_trigrams,
            weights: WeightStorage::Heap(weights),
        })
    }

    pub fn num_buckets(&self) -> u32 {
        self.num_buckets
    }

    pub fn num_classes(&self) -> u32 {
        self.num_classes
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(|s| s.as_str())
    }

    pub fn label_index_of(&self, label: &str) -> Option<u32> {
        self.label_index.get(label).copied()
    }

    pub fn scales(&self) -> &[f32] {
        &self.scales
    }

    pub fn biases(&self) -> &[f32] {
        &self.biases
    }

    pub fn include_trigrams(&self) -> bool {
        self.include_trigrams
    }

    pub fn weights(&self) -> &[i8] {
        self.weights.as_slice()
    }

    /// Materialize a class-major `[C][B]` copy of the weights. Allocates;
    /// intended for offline tooling, not the inference hot path.
    pub fn weights_class_major(&self) -> Vec<Vec<i8>> {
        let b = self.num_buckets as usize;
        let c = self.num_classes as usize;
        let bucket_major = self.weights.as_slice();
        let mut out = vec![Vec::with_capacity(b); c];
        for bucket in 0..b {
            for class in 0..c {
                out[class].push(bucket_major[bucket * c + class]);
            }
        }
        out
    }

    /// Build a feature extractor matching this model's `num_buckets` and
    /// declared trigram setting, guaranteeing inference tokenizes the same
    /// way the model was trained.
    pub fn create_extractor(&self) -> Result<FeatureExtractor> {
        FeatureExtractor::new(self.num_buckets, self.include_trigrams)
    }
}
