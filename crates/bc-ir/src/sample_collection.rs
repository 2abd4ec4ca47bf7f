//! Sample archives.

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::ModelError;
use crate::raw_file::RawFile;
use crate::sample::{Sample, SampleFormat};

/// An ordered, owned set of samples read from one archive.
#[derive(Clone, Debug)]
pub struct SampleCollection {
    pub name: String,
    /// Image the samples are decoded from
    pub raw: RawFile,
    /// Absolute offset of the archive in the image
    pub offset: u32,
    /// Size of the archive in bytes
    pub length: u32,
    /// Offset of the sample data area relative to `offset`
    pub sample_data_offset: u32,
    pub samples: Vec<Sample>,
    loaded: bool,
}

impl SampleCollection {
    pub fn new(name: &str, raw: RawFile, offset: u32, length: u32) -> Self {
        Self {
            name: String::from(name),
            raw,
            offset,
            length,
            sample_data_offset: 0,
            samples: Vec::new(),
            loaded: false,
        }
    }

    /// Append a sample and return it for further setup.
    pub fn add_sample(
        &mut self,
        offset: u32,
        length: u32,
        format: SampleFormat,
    ) -> Result<&mut Sample, ModelError> {
        if self.loaded {
            return Err(ModelError::AlreadyLoaded("sample collection"));
        }
        self.samples.push(Sample::new(offset, length, format));
        let index = self.samples.len() - 1;
        Ok(&mut self.samples[index])
    }

    pub fn mark_loaded(&mut self) {
        self.loaded = true;
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Offset of a sample relative to this collection's sample data area.
    pub fn relative_offset(&self, sample: &Sample) -> i64 {
        sample.offset as i64 - self.offset as i64 - self.sample_data_offset as i64
    }

    /// Find the sample stored at `offset` relative to the sample data area.
    ///
    /// When `data_length` is given, a sample whose encoded length also
    /// matches wins over an offset-only match.
    pub fn find_by_relative_offset(&self, offset: u32, data_length: Option<u32>) -> Option<usize> {
        let mut offset_match = None;
        for (i, sample) in self.samples.iter().enumerate() {
            if self.relative_offset(sample) != offset as i64 {
                continue;
            }
            match data_length {
                Some(len) if sample.data_length == len => return Some(i),
                Some(_) => {
                    offset_match.get_or_insert(i);
                }
                None => return Some(i),
            }
        }
        offset_match
    }

    /// Encoded bytes of a sample.
    pub fn sample_bytes(&self, sample: &Sample) -> &[u8] {
        self.raw.slice(sample.data_offset, sample.data_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::SampleEncoding;
    use alloc::vec;

    fn collection() -> SampleCollection {
        let raw = RawFile::new("samples.bin", vec![0; 0x400]);
        let mut coll = SampleCollection::new("samples", raw, 0x100, 0x300);
        coll.sample_data_offset = 0x10;
        let fmt = SampleFormat::mono(SampleEncoding::Pcm16, 22050);
        coll.add_sample(0x110, 0x40, fmt.clone()).unwrap();
        coll.add_sample(0x150, 0x20, fmt.clone()).unwrap();
        coll.add_sample(0x150, 0x30, fmt).unwrap();
        coll
    }

    #[test]
    fn relative_offset_subtracts_both_bases() {
        let coll = collection();
        assert_eq!(coll.relative_offset(&coll.samples[0]), 0);
        assert_eq!(coll.relative_offset(&coll.samples[1]), 0x40);
    }

    #[test]
    fn find_by_offset_uses_length_to_disambiguate() {
        let coll = collection();
        assert_eq!(coll.find_by_relative_offset(0x40, None), Some(1));
        assert_eq!(coll.find_by_relative_offset(0x40, Some(0x30)), Some(2));
        assert_eq!(coll.find_by_relative_offset(0x40, Some(0x99)), Some(1));
        assert_eq!(coll.find_by_relative_offset(0x41, None), None);
    }

    #[test]
    fn add_after_load_fails() {
        let mut coll = collection();
        coll.mark_loaded();
        let fmt = SampleFormat::mono(SampleEncoding::Pcm8, 8000);
        assert_eq!(
            coll.add_sample(0, 1, fmt).unwrap_err(),
            ModelError::AlreadyLoaded("sample collection")
        );
        assert_eq!(coll.len(), 3);
    }
}
