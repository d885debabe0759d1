use anyhow::anyhow;
use image::GrayImage;
use tracing::trace;

/// External decode capability: single-channel image in, payload text out.
///
/// `Ok(None)` means "no code found"; `Err` means the backend failed on this
/// input. The waterfall treats both as a miss.
pub trait QrDecoder: Send + Sync {
    fn name(&self) -> &str;

    fn decode(&self, image: &GrayImage) -> anyhow::Result<Option<String>>;
}

/// rqrr: localize and decode in one pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct RqrrDecoder;

impl QrDecoder for RqrrDecoder {
    fn name(&self) -> &str {
        "rqrr"
    }

    fn decode(&self, image: &GrayImage) -> anyhow::Result<Option<String>> {
        let (width, height) = image.dimensions();
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            width as usize,
            height as usize,
            |x, y| image.get_pixel(x as u32, y as u32)[0],
        );

        // False finder patterns produce grids that fail to decode; keep going.
        for grid in prepared.detect_grids() {
            match grid.decode() {
                Ok((_meta, content)) if !content.is_empty() => return Ok(Some(content)),
                Ok(_) => {}
                Err(e) => trace!("rqrr: grid skipped: {}", e),
            }
        }
        Ok(None)
    }
}

/// quircs: port of the quirc scanner.
#[derive(Debug, Default, Clone, Copy)]
pub struct QuircsDecoder;

impl QrDecoder for QuircsDecoder {
    fn name(&self) -> &str {
        "quircs"
    }

    fn decode(&self, image: &GrayImage) -> anyhow::Result<Option<String>> {
        let mut decoder = quircs::Quirc::default();
        let codes = decoder.identify(image.width() as usize, image.height() as usize, image.as_raw());

        for code in codes {
            match decode_quirc(code) {
                Ok(text) if !text.is_empty() => return Ok(Some(text)),
                Ok(_) => {}
                Err(e) => trace!("quircs: grid skipped: {e:#}"),
            }
        }
        Ok(None)
    }
}

fn decode_quirc<E>(code: Result<quircs::Code, E>) -> anyhow::Result<String>
where
    E: std::error::Error + Send + Sync + 'static,
{
    let decoded = code?.decode()?;
    String::from_utf8(decoded.payload).map_err(|e| anyhow!("payload is not UTF-8: {}", e))
}

/// rxing: port of ZXing, restricted to QR codes.
#[derive(Debug, Default, Clone, Copy)]
pub struct RxingDecoder;

impl QrDecoder for RxingDecoder {
    fn name(&self) -> &str {
        "rxing"
    }

    fn decode(&self, image: &GrayImage) -> anyhow::Result<Option<String>> {
        // `helpers::detect_in_luma` swaps width and height; go through the
        // hinted entry point so non-square inputs keep their shape.
        let result = rxing::helpers::detect_in_luma_with_hints(
            image.as_raw().clone(),
            image.width(),
            image.height(),
            Some(rxing::BarcodeFormat::QR_CODE),
            &mut rxing::DecodeHints::default(),
        );

        match result {
            Ok(found) if !found.getText().is_empty() => Ok(Some(found.getText().to_string())),
            Ok(_) => Ok(None),
            Err(rxing::Exceptions::NotFoundException(_)) => Ok(None),
            Err(e) => Err(anyhow!("rxing: {}", e)),
        }
    }
}
