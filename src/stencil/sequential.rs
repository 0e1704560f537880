use crate::error::*;
use crate::grid::*;
use crate::stencil::*;
use crate::util::*;

/// Visits every cell in linear order on the calling thread.
/// This is the oracle the parallel steppers are checked against.
#[derive(Copy, Clone, Debug, Default)]
pub struct SequentialStepper;

impl StencilStepper for SequentialStepper {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn step(&self, input: &GridBuffer, output: &mut GridBuffer) -> Result<()> {
        profiling::scope!("sequential_stepper");
        check_same_side(input, output)?;
        let n = input.n();
        let ib = input.buffer();
        let ob = output.buffer_mut();
        for id in 0..grid_buffer_size(n) {
            let coord = linear_to_coord(id, n);
            if !is_boundary(&coord, n) {
                ob[id] = stencil5p(ib, id, n);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn boundary_untouched() {
        let n = 6;
        let mut input = GridBuffer::new(n).unwrap();
        input.fill(50.0);
        let mut output = GridBuffer::new(n).unwrap();
        output.fill(-1.0);

        SequentialStepper.step(&input, &mut output).unwrap();
        for id in 0..n * n {
            let c = linear_to_coord(id, n);
            if is_boundary(&c, n) {
                assert_eq!(output[id], -1.0);
            } else {
                assert_eq!(output[id], 50.0);
            }
        }
    }

    #[test]
    fn tiny_grids_have_no_interior() {
        for n in 1..3 {
            let mut input = GridBuffer::new(n).unwrap();
            input.fill(7.0);
            let mut output = GridBuffer::new(n).unwrap();
            SequentialStepper.step(&input, &mut output).unwrap();
            assert!(output.buffer().iter().all(|v| *v == 0.0));
        }
    }

    #[test]
    fn side_mismatch() {
        let input = GridBuffer::new(4).unwrap();
        let mut output = GridBuffer::new(5).unwrap();
        assert!(matches!(
            SequentialStepper.step(&input, &mut output),
            Err(StencilError::DimensionMismatch { left: 4, right: 5 })
        ));
    }
}
