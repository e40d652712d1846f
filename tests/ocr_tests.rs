//! # OCR Tests Module
//!
//! Pre-OCR validation, format detection and text cleanup. None of these tests
//! need Tesseract language data: every failure path is hit before the engine
//! is created.

#[cfg(test)]
mod tests {
    use ingredient_guard::instance_manager::OcrInstanceManager;
    use ingredient_guard::ocr::{
        clean_extracted_text, detect_image_format, extract_text_from_image, format_size_limit,
        is_supported_image_format, validate_image_path, validate_image_with_format_limits,
    };
    use ingredient_guard::ocr_config::{FormatSizeLimits, OcrConfig};
    use ingredient_guard::ocr_errors::OcrError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const PNG_HEADER: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52,
    ];
    const JPEG_HEADER: &[u8] = &[
        0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01,
    ];

    fn temp_file_with(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(bytes).expect("Failed to write temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn path_of(file: &NamedTempFile) -> String {
        file.path().to_string_lossy().to_string()
    }

    #[test]
    fn test_validate_missing_and_empty_paths() {
        let config = OcrConfig::default();

        assert!(matches!(
            validate_image_path("", &config),
            Err(OcrError::Validation(_))
        ));
        assert!(matches!(
            validate_image_path("/definitely/not/here.png", &config),
            Err(OcrError::Validation(_))
        ));

        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let dir_path = dir.path().to_string_lossy().to_string();
        assert!(matches!(
            validate_image_path(&dir_path, &config),
            Err(OcrError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_empty_file() {
        let config = OcrConfig::default();
        let file = temp_file_with(&[]);

        let err = validate_image_path(&path_of(&file), &config).unwrap_err();
        assert!(err.to_string().contains("file is empty"));
    }

    #[test]
    fn test_validate_general_size_limit() {
        let config = OcrConfig {
            max_file_size: 8,
            ..OcrConfig::default()
        };
        let file = temp_file_with(PNG_HEADER);

        let err = validate_image_path(&path_of(&file), &config).unwrap_err();
        assert!(err.to_string().contains("file too large"));
    }

    #[test]
    fn test_validate_returns_size() {
        let config = OcrConfig::default();
        let file = temp_file_with(PNG_HEADER);

        assert_eq!(
            validate_image_path(&path_of(&file), &config).unwrap(),
            PNG_HEADER.len() as u64
        );
    }

    #[test]
    fn test_detect_supported_formats() {
        let config = OcrConfig::default();

        let png = temp_file_with(PNG_HEADER);
        assert_eq!(
            detect_image_format(&path_of(&png), &config).unwrap(),
            image::ImageFormat::Png
        );

        let jpeg = temp_file_with(JPEG_HEADER);
        assert_eq!(
            detect_image_format(&path_of(&jpeg), &config).unwrap(),
            image::ImageFormat::Jpeg
        );
    }

    #[test]
    fn test_detect_rejects_short_and_unknown_headers() {
        let config = OcrConfig::default();

        let short = temp_file_with(&[0x89, 0x50, 0x4E]);
        let err = detect_image_format(&path_of(&short), &config).unwrap_err();
        assert!(err.to_string().contains("not enough bytes"));

        let text = temp_file_with(b"Ingrediente: lapte, zahar, faina de grau");
        assert!(matches!(
            detect_image_format(&path_of(&text), &config),
            Err(OcrError::Validation(_))
        ));
    }

    #[test]
    fn test_format_size_limits() {
        let config = OcrConfig::default();
        let limits = FormatSizeLimits::default();

        assert_eq!(
            format_size_limit(image::ImageFormat::Png, &config),
            Some(limits.png_max)
        );
        assert_eq!(
            format_size_limit(image::ImageFormat::Bmp, &config),
            Some(limits.bmp_max)
        );
        assert_eq!(format_size_limit(image::ImageFormat::Gif, &config), None);
    }

    #[test]
    fn test_format_specific_limit_applies() {
        let mut config = OcrConfig::default();
        config.format_limits.png_max = 10;

        let png = temp_file_with(PNG_HEADER);
        let err = validate_image_with_format_limits(&path_of(&png), &config).unwrap_err();
        assert!(err.to_string().contains("too large for Png"));

        // JPEG keeps its own limit
        let jpeg = temp_file_with(JPEG_HEADER);
        let (format, size) = validate_image_with_format_limits(&path_of(&jpeg), &config).unwrap();
        assert_eq!(format, image::ImageFormat::Jpeg);
        assert_eq!(size, JPEG_HEADER.len() as u64);
    }

    #[test]
    fn test_is_supported_image_format() {
        let config = OcrConfig::default();

        let png = temp_file_with(PNG_HEADER);
        assert!(is_supported_image_format(&path_of(&png), &config));

        let gif = temp_file_with(b"GIF89a\x01\x00\x01\x00\x00\x00");
        assert!(!is_supported_image_format(&path_of(&gif), &config));

        assert!(!is_supported_image_format("/missing/label.jpg", &config));
    }

    #[test]
    fn test_clean_extracted_text() {
        let raw = "  Ingrediente:  \n\n   făină de grâu, zahăr\n\t\n lapte  \n";
        assert_eq!(
            clean_extracted_text(raw),
            "Ingrediente:\nfăină de grâu, zahăr\nlapte"
        );
        assert_eq!(clean_extracted_text(" \n\t\n"), "");
    }

    #[tokio::test]
    async fn test_extract_fails_validation_before_engine_start() {
        let config = OcrConfig::default();
        let manager = OcrInstanceManager::new();

        let result = extract_text_from_image("/missing/label.png", &config, &manager).await;
        assert!(matches!(result, Err(OcrError::Validation(_))));
        assert_eq!(manager.instance_count(), 0);

        let text = temp_file_with(b"not an image at all, just text");
        let result = extract_text_from_image(&path_of(&text), &config, &manager).await;
        assert!(matches!(result, Err(OcrError::Validation(_))));
        assert_eq!(manager.instance_count(), 0);
    }

    #[test]
    fn test_error_keys_and_kinds() {
        let cases = [
            (OcrError::Validation("x".into()), "validation", "error-image-invalid"),
            (OcrError::Initialization("x".into()), "initialization", "error-ocr-unavailable"),
            (OcrError::ImageLoad("x".into()), "image_load", "error-image-load"),
            (OcrError::Extraction("x".into()), "extraction", "error-ocr-extraction"),
            (OcrError::Timeout("x".into()), "timeout", "error-ocr-timeout"),
        ];

        for (error, kind, key) in cases {
            assert_eq!(error.kind(), kind);
            assert_eq!(error.user_message_key(), key);
        }
    }
}
