use crate::render::{draw_overlay_popup, write_hud, write_short_buffer_notice, Frame, Renderer};
use anyhow::Context;
use base64::Engine;
use std::io::Write;

/// Kitty graphics protocol presenter. Pixels are sent inline (`t=d`) as
/// base64 RGBA and placed over the visual rows; the HUD stays as text.
pub struct KittyRenderer {
    image_id: u32,
    placement_id: u32,
    b64_buf: Vec<u8>,
    overlay_visible_last: bool,
    last_hud_rows: u16,
}

impl Default for KittyRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl KittyRenderer {
    pub fn new() -> Self {
        Self {
            image_id: 1,
            placement_id: 1,
            b64_buf: Vec::new(),
            overlay_visible_last: false,
            last_hud_rows: 0,
        }
    }

    pub fn image_id(&self) -> u32 {
        self.image_id
    }
}

impl Renderer for KittyRenderer {
    fn name(&self) -> &'static str {
        "kitty"
    }

    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let cols = frame.term_cols as usize;
        let visual_rows = frame.visual_rows as usize;
        let w = frame.pixel_width;
        let h = frame.pixel_height;

        if cols == 0 || visual_rows == 0 || w == 0 || h == 0 {
            return Ok(());
        }
        let need = w.saturating_mul(h).saturating_mul(4);
        if frame.pixels_rgba.len() < need {
            // Drop the stale image so the notice is visible.
            write!(out, "\x1b_Ga=d,d=I,i={}\x1b\\", self.image_id)?;
            return write_short_buffer_notice(frame, need, out);
        }

        if frame.sync_updates {
            out.write_all(b"\x1b[?2026h")?;
        }

        if let Some(text) = frame.overlay {
            // Drop the image so the popup text is readable.
            write!(out, "\x1b_Ga=d,d=I,i={}\x1b\\", self.image_id)?;
            clear_text_rows(out, frame.term_rows as usize)?;
            write_hud(frame, cols, visual_rows, out)?;
            draw_overlay_popup(out, frame.term_cols, frame.term_rows, text)?;
            self.overlay_visible_last = true;
            self.last_hud_rows = frame.hud_rows;
        } else {
            out.write_all(b"\x1b[H")?;
            write_kitty_direct_rgba(
                out,
                &frame.pixels_rgba[..need],
                w,
                h,
                cols,
                visual_rows,
                self.image_id,
                self.placement_id,
                &mut self.b64_buf,
            )?;

            if frame.hud_rows != self.last_hud_rows {
                clear_text_rows(out, frame.term_rows as usize)?;
            }
            if self.overlay_visible_last {
                clear_text_rows(out, visual_rows)?;
            }
            write_hud(frame, cols, visual_rows, out)?;

            self.overlay_visible_last = false;
            self.last_hud_rows = frame.hud_rows;
        }

        if frame.sync_updates {
            out.write_all(b"\x1b[?2026l")?;
        }
        out.flush()?;
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn write_kitty_direct_rgba(
    out: &mut dyn Write,
    rgba: &[u8],
    w: usize,
    h: usize,
    cols: usize,
    rows: usize,
    image_id: u32,
    placement_id: u32,
    b64_buf: &mut Vec<u8>,
) -> anyhow::Result<()> {
    // Multiple of 3 so every chunk but the last encodes without padding.
    const RAW_CHUNK: usize = 3 * 1024;

    let len = rgba.len();
    let mut off = 0usize;
    let mut first = true;
    while off < len {
        let end = (off + RAW_CHUNK).min(len);
        let chunk = &rgba[off..end];
        let b64_len = chunk.len().div_ceil(3) * 4;
        if b64_buf.len() < b64_len {
            b64_buf.resize(b64_len, 0);
        }

        let written = base64::engine::general_purpose::STANDARD
            .encode_slice(chunk, &mut b64_buf[..b64_len])
            .context("base64 encode pixels")?;

        let more = u8::from(end < len);
        if first {
            write!(
                out,
                "\x1b_Ga=T,f=32,s={w},v={h},t=d,i={image_id},p={placement_id},c={cols},r={rows},C=1,q=2,z=-1,m={more};"
            )?;
            first = false;
        } else {
            write!(out, "\x1b_Gm={more};")?;
        }

        out.write_all(&b64_buf[..written])?;
        out.write_all(b"\x1b\\")?;
        off = end;
    }

    Ok(())
}

fn clear_text_rows(out: &mut dyn Write, rows: usize) -> anyhow::Result<()> {
    for row in 1..=rows {
        write!(out, "\x1b[{row};1H\x1b[0m\x1b[2K")?;
    }
    Ok(())
}
