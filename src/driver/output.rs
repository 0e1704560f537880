use crate::error::*;
use crate::grid::*;
use std::io::Write;

/// Rows separated by newlines, cells by a single space.
pub fn write_text<W: Write>(grid: &GridBuffer, mut writer: W) -> Result<()> {
    for row in grid.rows() {
        let mut cells = row.iter();
        if let Some(first) = cells.next() {
            write!(writer, "{}", first)?;
        }
        for cell in cells {
            write!(writer, " {}", cell)?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_text_file<P: AsRef<std::path::Path>>(
    grid: &GridBuffer,
    path: &P,
) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_text(grid, std::io::BufWriter::new(file))
}

/// Fixed width console rendering, one decimal per cell.
pub fn format_grid(grid: &GridBuffer) -> String {
    let mut result = String::with_capacity(grid.buffer_size() * 6 + grid.n());
    for row in grid.rows() {
        for cell in row {
            result.push_str(&format!("{:>6.1}", cell));
        }
        result.push('\n');
    }
    result
}

/// TURBO colormap over `[CELL_MIN, CELL_MAX]`, `y` grows downward.
pub fn write_image<P: AsRef<std::path::Path>>(
    grid: &GridBuffer,
    path: &P,
) -> Result<()> {
    let n = grid.n() as u32;
    let gradient = colorous::TURBO;
    let mut img = image::RgbImage::new(n, n);
    for (y, row) in grid.rows().enumerate() {
        for (x, cell) in row.iter().enumerate() {
            let r = ((cell - CELL_MIN) / (CELL_MAX - CELL_MIN)).clamp(0.0, 1.0);
            let c = gradient.eval_continuous(r as f64);
            img.put_pixel(x as u32, y as u32, image::Rgb(c.as_array()));
        }
    }
    img.save(path)?;
    Ok(())
}
