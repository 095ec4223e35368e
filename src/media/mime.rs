pub fn detect_image_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [0x89, 0x50, 0x4E, 0x47, ..] => "image/png",
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => "image/webp",
        _ => {
            tracing::warn!(
                "Unrecognized image format (first 4 bytes: {:02X?}), falling back to image/png",
                &bytes[..bytes.len().min(4)]
            );
            "image/png"
        }
    }
}

pub fn detect_audio_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [b'I', b'D', b'3', ..] => "audio/mpeg",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => "audio/wav",
        [b'O', b'g', b'g', b'S', ..] => "audio/ogg",
        [b'f', b'L', b'a', b'C', ..] => "audio/flac",
        [_, _, _, _, b'f', b't', b'y', b'p', ..] => "audio/mp4",
        // ADTS sync word (AAC) must be checked before the generic MPEG frame sync.
        [0xFF, second, ..] if second & 0xF6 == 0xF0 => "audio/aac",
        [0xFF, second, ..] if second & 0xE0 == 0xE0 => "audio/mpeg",
        _ => {
            tracing::warn!(
                "Unrecognized audio format (first 4 bytes: {:02X?}), falling back to audio/mpeg",
                &bytes[..bytes.len().min(4)]
            );
            "audio/mpeg"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_png() {
        assert_eq!(
            detect_image_mime(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A]),
            "image/png"
        );
    }

    #[test]
    fn test_detect_jpeg() {
        assert_eq!(detect_image_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
    }

    #[test]
    fn test_detect_webp() {
        assert_eq!(
            detect_image_mime(&[
                0x52, 0x49, 0x46, 0x46, 0x00, 0x00, 0x00, 0x00, 0x57, 0x45, 0x42, 0x50
            ]),
            "image/webp"
        );
    }

    #[test]
    fn test_unknown_image_falls_back_to_png() {
        assert_eq!(detect_image_mime(&[0x00, 0x01, 0x02, 0x03]), "image/png");
        assert_eq!(detect_image_mime(&[]), "image/png");
    }

    #[test]
    fn test_detect_mp3() {
        assert_eq!(detect_audio_mime(b"ID3\x04\x00"), "audio/mpeg");
        assert_eq!(detect_audio_mime(&[0xFF, 0xFB, 0x90, 0x64]), "audio/mpeg");
    }

    #[test]
    fn test_detect_aac() {
        assert_eq!(detect_audio_mime(&[0xFF, 0xF1, 0x50, 0x80]), "audio/aac");
    }

    #[test]
    fn test_detect_wav_ogg_flac_m4a() {
        assert_eq!(detect_audio_mime(b"RIFF\x24\x08\x00\x00WAVEfmt "), "audio/wav");
        assert_eq!(detect_audio_mime(b"OggS\x00\x02"), "audio/ogg");
        assert_eq!(detect_audio_mime(b"fLaC\x00\x00"), "audio/flac");
        assert_eq!(detect_audio_mime(b"\x00\x00\x00\x20ftypM4A "), "audio/mp4");
    }

    #[test]
    fn test_unknown_audio_falls_back_to_mpeg() {
        assert_eq!(detect_audio_mime(&[0x00, 0x01]), "audio/mpeg");
        assert_eq!(detect_audio_mime(&[]), "audio/mpeg");
    }
}
