//! Header loader.
//!
//! Reads just enough of the input to learn the image's architecture and its two declared
//! sizes, then allocates the zero-filled image buffer and copies the header prefix into it.
//! Nothing beyond `size_of_headers` is copied here; section data is materialized separately.

use std::io::{Read, Seek, SeekFrom};

use log::{debug, warn};

use crate::{
    config::LoadConfig,
    file::{
        headers::{
            Architecture, DosHeader, FileHeader, OptionalHeader, OptionalMagic, DOS_HEADER_SIZE,
            DOS_MAGIC, FILE_HEADER_SIZE, NT_SIGNATURE, OPTIONAL_HEADER64_SIZE, SIGNATURE_SIZE,
        },
        image::RawImage,
    },
    Result,
};

/// Result of the header loader: the allocated image and the architecture it was loaded as.
pub(crate) struct LoadedImage {
    pub image: RawImage,
    pub architecture: Architecture,
}

/// Read the header prefix of `reader` into a freshly allocated image buffer.
///
/// The optional header is read up to its declared size, but never more than the larger of
/// the two layouts; a shorter declared size leaves the remaining fields zero.
pub(crate) fn load<R: Read + Seek>(reader: &mut R, config: &LoadConfig) -> Result<LoadedImage> {
    let mut dos_bytes = [0_u8; DOS_HEADER_SIZE];
    reader.read_exact(&mut dos_bytes)?;

    let dos_header = DosHeader::parse(&dos_bytes)?;
    if dos_header.e_magic != DOS_MAGIC {
        return Err(malformed_error!(
            "magic number in dos header is 0x{:04X}, but expected 0x{:04X}",
            dos_header.e_magic,
            DOS_MAGIC
        ));
    }

    let Ok(nt_offset) = u64::try_from(dos_header.e_lfanew) else {
        return Err(malformed_error!(
            "e_lfanew is negative ({})",
            dos_header.e_lfanew
        ));
    };

    reader.seek(SeekFrom::Start(nt_offset))?;

    let mut signature = [0_u8; SIGNATURE_SIZE];
    reader.read_exact(&mut signature)?;
    let signature = u32::from_le_bytes(signature);
    if signature != NT_SIGNATURE {
        return Err(malformed_error!(
            "image signature in nt header is 0x{:08X}, but expected 0x{:08X}",
            signature,
            NT_SIGNATURE
        ));
    }

    let mut file_bytes = [0_u8; FILE_HEADER_SIZE];
    reader.read_exact(&mut file_bytes)?;
    let file_header = FileHeader::parse(&file_bytes)?;

    let declared = usize::from(file_header.size_of_optional_header).min(OPTIONAL_HEADER64_SIZE);
    let mut optional_bytes = [0_u8; OPTIONAL_HEADER64_SIZE];
    reader.read_exact(&mut optional_bytes[..declared])?;

    let Some(architecture) = Architecture::from_machine(file_header.machine) else {
        return Err(malformed_error!(
            "unknown machine code: 0x{:04X}",
            file_header.machine
        ));
    };

    let optional_header = OptionalHeader::parse(architecture, &optional_bytes)?;
    let expected_magic = match architecture {
        Architecture::Pe32 => OptionalMagic::Pe32,
        Architecture::Pe64 => OptionalMagic::Pe64,
    };
    if optional_header.magic() != expected_magic as u16 {
        warn!(
            "optional header magic 0x{:04X} does not match machine 0x{:04X}, reading it as {}",
            optional_header.magic(),
            file_header.machine,
            architecture
        );
    }

    let image_length = optional_header.size_of_image();
    let header_length = optional_header.size_of_headers();

    if image_length == 0 {
        return Err(malformed_error!(
            "invalid image optional header: size_of_image is 0"
        ));
    }
    if header_length == 0 {
        return Err(malformed_error!(
            "invalid image optional header: size_of_headers is 0"
        ));
    }
    if header_length > image_length {
        return Err(malformed_error!(
            "invalid image optional header: size_of_headers 0x{:X} exceeds size_of_image 0x{:X}",
            header_length,
            image_length
        ));
    }
    if u64::from(image_length) > config.max_image_size {
        return Err(malformed_error!(
            "size_of_image 0x{:X} exceeds the configured limit of 0x{:X}",
            image_length,
            config.max_image_size
        ));
    }

    let (Ok(image_length), Ok(header_length)) =
        (usize::try_from(image_length), usize::try_from(header_length))
    else {
        return Err(malformed_error!("declared image size does not fit in memory"));
    };

    let mut data = Vec::new();
    if data.try_reserve_exact(image_length).is_err() {
        return Err(malformed_error!(
            "failed to allocate 0x{:X} bytes for the image",
            image_length
        ));
    }
    data.resize(image_length, 0);

    reader.seek(SeekFrom::Start(0))?;
    reader.read_exact(&mut data[..header_length])?;

    debug!(
        "loaded {} headers: image 0x{:X} bytes, headers 0x{:X} bytes",
        architecture, image_length, header_length
    );

    Ok(LoadedImage {
        image: RawImage::new(data, header_length),
        architecture,
    })
}
