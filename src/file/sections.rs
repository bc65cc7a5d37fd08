//! Section materializer.
//!
//! Copies the raw data of every section from its file offset to its virtual address in the
//! image buffer, turning the on-disk layout into the RVA-addressable layout every directory
//! resolver works on.

use std::io::{Read, Seek, SeekFrom};

use log::{debug, warn};

use crate::{
    file::{headers::SectionHeader, image::RawImage},
    Result, Structure,
};

/// Copy each section's raw data into `image`.
///
/// Sections without raw data are skipped. The destination window is
/// `[virtual_address, virtual_address + virtual_size)`, or `size_of_raw_data` long when the
/// virtual size is zero, and must lie inside the image past the header prefix. Raw data
/// longer than the window is cut to the window.
///
/// The header prefix was already resolved when this runs, so a window reaching into it
/// would leave the decoded headers disagreeing with the buffer they came from.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] tagged with the section index if a window overlaps
/// the header prefix or leaves the image, and [`crate::Error::FileError`] if the raw data
/// cannot be read.
pub(crate) fn materialize<R: Read + Seek>(
    reader: &mut R,
    image: &mut RawImage,
    sections: &[SectionHeader],
) -> Result<()> {
    for (index, section) in sections.iter().enumerate() {
        if section.size_of_raw_data == 0 {
            continue;
        }

        let window_len = if section.virtual_size == 0 {
            section.size_of_raw_data
        } else {
            section.virtual_size
        };
        let copy_len = section.size_of_raw_data.min(window_len);

        if u64::from(section.virtual_address) < image.header_len() as u64 {
            return Err(out_of_bounds_error!(
                Structure::Section,
                Some(index),
                "'{}' at 0x{:08X} overlaps the 0x{:X} byte header region",
                section.name_str(),
                section.virtual_address,
                image.header_len()
            ));
        }

        let window = image
            .window_mut(
                u64::from(section.virtual_address),
                u64::from(window_len),
                Structure::Section,
                Some(index),
            )
            .map_err(|_| {
                out_of_bounds_error!(
                    Structure::Section,
                    Some(index),
                    "'{}' at 0x{:08X} with 0x{:X} bytes ends past size_of_image",
                    section.name_str(),
                    section.virtual_address,
                    window_len
                )
            })?;

        if copy_len < section.size_of_raw_data {
            warn!(
                "section '{}' has 0x{:X} bytes of raw data, only the first 0x{:X} fit its virtual size",
                section.name_str(),
                section.size_of_raw_data,
                copy_len
            );
        }

        reader.seek(SeekFrom::Start(u64::from(section.pointer_to_raw_data)))?;
        reader.read_exact(&mut window[..copy_len as usize])?;

        debug!(
            "materialized section '{}': 0x{:X} bytes from file offset 0x{:X} to 0x{:08X}",
            section.name_str(),
            copy_len,
            section.pointer_to_raw_data,
            section.virtual_address
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::{
        config::LoadConfig,
        file::{loader::load, regions::resolve},
        test::PeBuilder,
        Error,
    };

    fn materialize_builder(builder: &PeBuilder) -> Result<RawImage> {
        let mut cursor = Cursor::new(builder.build());
        let loaded = load(&mut cursor, &LoadConfig::default())?;
        let mut image = loaded.image;
        let headers = resolve(&image, loaded.architecture)?;
        materialize(&mut cursor, &mut image, &headers.sections)?;
        Ok(image)
    }

    #[test]
    fn sections_land_at_virtual_addresses() {
        let image = materialize_builder(&PeBuilder::sample32()).unwrap();

        assert_eq!(&image.data()[0x1000..0x1005], &[0x55, 0x8B, 0xEC, 0x5D, 0xC3]);
        assert_eq!(image.c_str(0x2040).unwrap(), b"sample.dll");
        assert_eq!(image.c_str(0x2400).unwrap(), b"KERNEL32.dll");
    }

    #[test]
    fn raw_data_cut_to_virtual_size() {
        let builder = PeBuilder::new32()
            .section(".text", 0x1000, 0x10, 0x400, 0x200, 0x6000_0020)
            .put(0x1000, &[0xAA; 0x20]);
        let image = materialize_builder(&builder).unwrap();

        assert!(image.data()[0x1000..0x1010].iter().all(|b| *b == 0xAA));
        assert!(image.data()[0x1010..0x1020].iter().all(|b| *b == 0));
    }

    #[test]
    fn zero_virtual_size_uses_raw_size() {
        let builder = PeBuilder::new32()
            .section(".data", 0x2000, 0, 0x400, 0x200, 0xC000_0040)
            .put(0x21FF, &[0x42]);
        let image = materialize_builder(&builder).unwrap();
        assert_eq!(image.data()[0x21FF], 0x42);
    }

    #[test]
    fn uninitialized_section_is_skipped() {
        let builder = PeBuilder::new32()
            .section(".bss", 0x3000, 0x8000, 0, 0, 0xC000_0080)
            .section(".data", 0x1000, 0x200, 0x400, 0x200, 0xC000_0040);
        assert!(materialize_builder(&builder).is_ok());
    }

    #[test]
    fn window_past_image_end() {
        let builder = PeBuilder::new32()
            .section(".text", 0x1000, 0x100, 0x400, 0x200, 0x6000_0020)
            .section(".data", 0x3F00, 0x200, 0x600, 0x200, 0xC000_0040);

        match materialize_builder(&builder) {
            Err(Error::OutOfBounds {
                structure, index, ..
            }) => {
                assert_eq!(structure, Structure::Section);
                assert_eq!(index, Some(1));
            }
            other => panic!("Expected OutOfBounds, got {:?}", other.err()),
        }
    }

    #[test]
    fn window_overlapping_headers() {
        let builder = PeBuilder::sample32().section(".low", 0, 0x200, 0x400, 0x200, 0x6000_0020);

        match materialize_builder(&builder) {
            Err(Error::OutOfBounds {
                structure,
                index,
                message,
            }) => {
                assert_eq!(structure, Structure::Section);
                assert_eq!(index, Some(3));
                assert!(message.contains("header region"), "{message}");
            }
            other => panic!("Expected OutOfBounds, got {:?}", other.err()),
        }
    }

    #[test]
    fn window_ending_inside_headers() {
        let builder = PeBuilder::new32().section(".low", 0x3F0, 0x20, 0x400, 0x200, 0x6000_0020);
        assert!(matches!(
            materialize_builder(&builder),
            Err(Error::OutOfBounds { index: Some(0), .. })
        ));
    }

    #[test]
    fn window_starting_at_header_end() {
        let builder = PeBuilder::new32().section(".hdr", 0x400, 0x200, 0x400, 0x200, 0x6000_0020);
        let image = materialize_builder(&builder).unwrap();
        assert_eq!(image.header_len(), 0x400);
    }

    #[test]
    fn window_overflowing_u32() {
        let builder = PeBuilder::new32().section(".x", 0xFFFF_FF00, 0x200, 0x400, 0x200, 0);
        assert!(matches!(
            materialize_builder(&builder),
            Err(Error::OutOfBounds { index: Some(0), .. })
        ));
    }

    #[test]
    fn raw_data_past_end_of_file() {
        let builder = PeBuilder::new32().section(".text", 0x1000, 0x100, 0x400, 0x100, 0);
        let mut data = builder.build();
        data.truncate(0x480);

        let mut cursor = Cursor::new(data);
        let loaded = load(&mut cursor, &LoadConfig::default()).unwrap();
        let mut image = loaded.image;
        let headers = resolve(&image, loaded.architecture).unwrap();
        assert!(matches!(
            materialize(&mut cursor, &mut image, &headers.sections),
            Err(Error::FileError(_))
        ));
    }
}
