//! Conversions between `ndarray` arrays and `candle` tensors.
//!
//! Arrays are copied in logical (row-major) order regardless of their
//! memory layout.

use candle_core::{DType, Device, Result, Tensor};
use ndarray::{Array2, Array3, ArrayBase, Data, Dimension};

/// Copy an `f32` array into a tensor of the same shape.
pub fn tensor_from_array<S, D>(array: &ArrayBase<S, D>, device: &Device) -> Result<Tensor>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    let data: Vec<f32> = array.iter().copied().collect();
    Tensor::from_vec(data, array.shape().to_vec(), device)
}

/// Copy a boolean mask into a `u8` tensor (1 = set), usable with
/// [`Tensor::where_cond`].
pub fn mask_tensor<S, D>(mask: &ArrayBase<S, D>, device: &Device) -> Result<Tensor>
where
    S: Data<Elem = bool>,
    D: Dimension,
{
    let data: Vec<u8> = mask.iter().map(|&b| u8::from(b)).collect();
    Tensor::from_vec(data, mask.shape().to_vec(), device)
}

/// Read a rank-2 tensor back into an array.
pub fn array2_from_tensor(tensor: &Tensor) -> Result<Array2<f32>> {
    let (a, b) = tensor.dims2()?;
    let data = tensor.to_dtype(DType::F32)?.flatten_all()?.to_vec1::<f32>()?;
    Array2::from_shape_vec((a, b), data).map_err(|e| candle_core::Error::Msg(e.to_string()))
}

/// Read a rank-3 tensor back into an array.
pub fn array3_from_tensor(tensor: &Tensor) -> Result<Array3<f32>> {
    let (a, b, c) = tensor.dims3()?;
    let data = tensor.to_dtype(DType::F32)?.flatten_all()?.to_vec1::<f32>()?;
    Array3::from_shape_vec((a, b, c), data).map_err(|e| candle_core::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Axis};

    #[test]
    fn permuted_views_copy_in_logical_order() {
        let a = array![[[1.0f32, 2.0], [3.0, 4.0]], [[5.0, 6.0], [7.0, 8.0]]];
        let swapped = a.view().permuted_axes([1, 0, 2]);
        let t = tensor_from_array(&swapped, &Device::Cpu).unwrap();
        let back = array3_from_tensor(&t).unwrap();
        assert_eq!(back, swapped.to_owned());
        assert_eq!(back.index_axis(Axis(0), 0), array![[1.0, 2.0], [5.0, 6.0]]);
    }

    #[test]
    fn masks_become_u8() {
        let m = array![[true, false], [false, true]];
        let t = mask_tensor(&m, &Device::Cpu).unwrap();
        assert_eq!(t.dtype(), DType::U8);
        assert_eq!(t.to_vec2::<u8>().unwrap(), vec![vec![1, 0], vec![0, 1]]);
    }
}
