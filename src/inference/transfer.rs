//! Shape-transfer functions
//!
//! Each function maps the ordered input shapes of a layer plus its
//! parameters to the ordered output shapes. Dimensions are signed here;
//! the caller rejects any negative result. Returning `None` leaves the
//! layer's outputs unresolved.

use crate::params::Parameters;

type Dims = Vec<i64>;

/// First input, the one almost every rule reads
fn first(inputs: &[Dims]) -> Option<&Dims> {
    inputs.first()
}

fn at(dims: &[i64], index: i64) -> Option<i64> {
    usize::try_from(index).ok().and_then(|i| dims.get(i).copied())
}

/// Normalize a possibly negative axis against `rank`
fn axis(index: i64, rank: usize) -> Option<usize> {
    let rank = rank as i64;
    let index = if index < 0 { index + rank } else { index };
    (0..rank).contains(&index).then_some(index as usize)
}

/// `Array.prototype.slice` bounds: negative offsets count from the end and
/// everything clamps to the array.
fn js_slice(dims: &[i64], start: i64, end: Option<i64>) -> Dims {
    let len = dims.len() as i64;
    let clamp = |i: i64| -> usize {
        let i = if i < 0 { (len + i).max(0) } else { i.min(len) };
        i as usize
    };
    let start = clamp(start);
    let end = clamp(end.unwrap_or(len));
    if start >= end {
        Vec::new()
    } else {
        dims[start..end].to_vec()
    }
}

fn bit(mask: u32, i: usize) -> bool {
    i < 32 && (mask >> i) & 1 == 1
}

fn bit_len(mask: u32) -> usize {
    (32 - mask.leading_zeros()) as usize
}

fn mask(params: &Parameters, key: &str) -> u32 {
    // masks are 32-bit words; wrapping matches how exporters store them
    params.int(key).map(|m| m as u32).unwrap_or(0)
}

fn product(dims: &[i64]) -> Option<i64> {
    dims.iter().try_fold(1i64, |acc, &d| acc.checked_mul(d))
}

/// Spatial output size for VALID/SAME padding
fn spatial(size: i64, stride: i64, ksize: i64, pad: i64, padding: &str) -> Option<i64> {
    match padding {
        "VALID" => size
            .checked_add(stride)?
            .checked_add(pad)?
            .checked_sub(ksize)?
            .checked_div(stride),
        "SAME" => size.checked_add(stride)?.checked_sub(1)?.checked_div(stride),
        _ => None,
    }
}

pub fn passthrough(inputs: &[Dims]) -> Option<Vec<Dims>> {
    Some(vec![first(inputs)?.clone()])
}

/// Numpy broadcasting of two operands
pub fn broadcast(inputs: &[Dims]) -> Option<Vec<Dims>> {
    let (a, b) = match inputs {
        [a, b, ..] => (a, b),
        _ => return None,
    };
    let (mut longer, shorter) = if a.len() >= b.len() {
        (a.clone(), b)
    } else {
        (b.clone(), a)
    };
    let offset = longer.len() - shorter.len();
    for (i, dim) in longer.iter_mut().enumerate() {
        let other = if i < offset { 1 } else { shorter[i - offset] };
        *dim = (*dim).max(other);
    }
    Some(vec![longer])
}

pub fn concat(inputs: &[Dims], params: &Parameters) -> Option<Vec<Dims>> {
    let mut out = first(inputs)?.clone();
    let dim = axis(params.int("dim")?, out.len())?;
    out[dim] = inputs
        .iter()
        .try_fold(0i64, |total, shape| total.checked_add(*shape.get(dim)?))?;
    Some(vec![out])
}

pub fn conv1d(inputs: &[Dims], params: &Parameters) -> Option<Vec<Dims>> {
    let input = first(inputs)?;
    let stride = params.int("stride")?;
    let ksize = params.int("ksize")?;
    let out_h = spatial(at(input, 1)?, stride, ksize, 0, params.str("padding")?)?;
    Some(vec![vec![at(input, 0)?, out_h, params.int("weights")?]])
}

/// `(N, out_h, out_w)` shared by convolution and pooling
fn conv2d_spatial(input: &[i64], params: &Parameters, pad: [i64; 4]) -> Option<(i64, i64, i64)> {
    let padding = params.str("padding")?;
    let out_h = spatial(
        at(input, 1)?,
        params.int("stride_h")?,
        params.int("ksize_h")?,
        pad[0].checked_add(pad[1])?,
        padding,
    )?;
    let out_w = spatial(
        at(input, 2)?,
        params.int("stride_w")?,
        params.int("ksize_w")?,
        pad[2].checked_add(pad[3])?,
        padding,
    )?;
    Some((at(input, 0)?, out_h, out_w))
}

pub fn convolution(inputs: &[Dims], params: &Parameters) -> Option<Vec<Dims>> {
    let input = first(inputs)?;
    let pads = match params.int_list("pad") {
        Some(p) => [*p.first()?, *p.get(1)?, *p.get(2)?, *p.get(3)?],
        None => [0; 4],
    };
    let (batch, out_h, out_w) = conv2d_spatial(input, params, pads)?;
    Some(vec![vec![batch, out_h, out_w, params.int("weights")?]])
}

pub fn pooling(inputs: &[Dims], params: &Parameters) -> Option<Vec<Dims>> {
    let input = first(inputs)?;
    let (batch, out_h, out_w) = conv2d_spatial(input, params, [0; 4])?;
    Some(vec![vec![batch, out_h, out_w, at(input, 3)?]])
}

pub fn deconvolution(inputs: &[Dims], params: &Parameters) -> Option<Vec<Dims>> {
    let input = first(inputs)?;
    let out = params
        .int_list("output_shape")?
        .into_iter()
        .enumerate()
        .map(|(i, dim)| if dim == 0 { input.get(i).copied() } else { Some(dim) })
        .collect::<Option<Dims>>()?;
    Some(vec![out])
}

pub fn fullconnect(inputs: &[Dims], params: &Parameters) -> Option<Vec<Dims>> {
    let mut out = js_slice(first(inputs)?, 0, Some(params.int("axis")?));
    out.push(params.int("weights")?);
    Some(vec![out])
}

pub fn gather(inputs: &[Dims], params: &Parameters) -> Option<Vec<Dims>> {
    let (params_shape, indices) = match inputs {
        [p, i, ..] => (p, i),
        _ => return None,
    };
    let mut out = indices.clone();
    out.extend(js_slice(params_shape, params.int("axis")?.checked_add(1)?, None));
    Some(vec![out])
}

pub fn lstm(inputs: &[Dims], params: &Parameters) -> Option<Vec<Dims>> {
    let input = first(inputs)?;
    let weights = params.int("weights")?;
    let output = if params.is_set("num_proj") {
        params.int("num_proj")?
    } else {
        weights
    };
    let batch = at(input, if params.flag("time_major") { 1 } else { 0 })?;
    let sequence = if params.flag("return_sequences") {
        vec![at(input, 0)?, at(input, 1)?, output]
    } else {
        vec![batch, output]
    };
    Some(vec![sequence, vec![batch, output], vec![batch, weights]])
}

pub fn matmul(inputs: &[Dims], params: &Parameters) -> Option<Vec<Dims>> {
    let (a, b) = match inputs {
        [a, b, ..] => (a, b),
        _ => return None,
    };
    let mut out = js_slice(a, 0, Some(-2));
    if params.flag("transpose_a") {
        out.extend(js_slice(a, -1, None));
    } else {
        out.extend(js_slice(a, -2, Some(-1)));
    }
    if params.flag("transpose_b") {
        out.extend(js_slice(b, -2, Some(-1)));
    } else {
        out.extend(js_slice(b, -1, None));
    }
    Some(vec![out])
}

pub fn pad(inputs: &[Dims], params: &Parameters) -> Option<Vec<Dims>> {
    let input = first(inputs)?;
    let padding = params.int_pairs("padding_value")?;
    let out = input
        .iter()
        .enumerate()
        .map(|(i, dim)| {
            let &(before, after) = padding.get(i)?;
            dim.checked_add(before)?.checked_add(after)
        })
        .collect::<Option<Dims>>()?;
    Some(vec![out])
}

pub fn permute(inputs: &[Dims], params: &Parameters) -> Option<Vec<Dims>> {
    let input = first(inputs)?;
    let perm = params.int_list("perm")?;
    let out = (0..input.len())
        .map(|i| at(input, *perm.get(i)?))
        .collect::<Option<Dims>>()?;
    Some(vec![out])
}

/// Shared rule of the reduce family
pub fn reduce(inputs: &[Dims], params: &Parameters) -> Option<Vec<Dims>> {
    let mut out = first(inputs)?.clone();
    let mut axes = params
        .int_list("axis_list")?
        .into_iter()
        .map(|a| axis(a, out.len()))
        .collect::<Option<Vec<usize>>>()?;
    if params.flag("keep_dims") {
        for a in axes {
            out[a] = 1;
        }
    } else {
        axes.sort_unstable_by(|a, b| b.cmp(a));
        axes.dedup();
        for a in axes {
            out.remove(a);
        }
        if out.is_empty() {
            out.push(0);
        }
    }
    Some(vec![out])
}

pub fn repeat(inputs: &[Dims], params: &Parameters) -> Option<Vec<Dims>> {
    let mut out = first(inputs)?.clone();
    let a = axis(params.int("axis")?, out.len())?;
    out[a] = params.int("maxlen")?;
    Some(vec![out])
}

/// `0` copies the input dimension at the same position; a single `-1`
/// absorbs whatever element count is left.
pub fn reshape(inputs: &[Dims], params: &Parameters) -> Option<Vec<Dims>> {
    let input = first(inputs)?;
    let target = params.int_list("shape")?;
    let mut inferred = Vec::new();
    let mut out = target
        .iter()
        .enumerate()
        .map(|(i, &dim)| match dim {
            0 => input.get(i).copied(),
            -1 => {
                inferred.push(i);
                Some(1)
            }
            d => Some(d),
        })
        .collect::<Option<Dims>>()?;

    match inferred.as_slice() {
        [] => {}
        [index] => {
            let total = product(input)?;
            let known = product(&out)?;
            if known == 0 || total % known != 0 {
                return None;
            }
            out[*index] = total / known;
        }
        _ => return None,
    }
    Some(vec![out])
}

pub fn sequence_mask(inputs: &[Dims], params: &Parameters) -> Option<Vec<Dims>> {
    let mut out = first(inputs)?.clone();
    out.push(params.int("maxlen")?);
    Some(vec![out])
}

pub fn slice(inputs: &[Dims], params: &Parameters) -> Option<Vec<Dims>> {
    let input = first(inputs)?;
    let out = params
        .int_list("size")?
        .into_iter()
        .enumerate()
        .map(|(i, size)| if size == -1 { input.get(i).copied() } else { Some(size) })
        .collect::<Option<Dims>>()?;
    Some(vec![out])
}

pub fn squeeze(inputs: &[Dims], params: &Parameters) -> Option<Vec<Dims>> {
    let mut out = first(inputs)?.clone();
    let mut axes = params
        .int_list("axis_list")?
        .into_iter()
        .map(|a| axis(a, out.len()))
        .collect::<Option<Vec<usize>>>()?;
    axes.sort_unstable_by(|a, b| b.cmp(a));
    axes.dedup();
    for a in axes {
        out.remove(a);
    }
    Some(vec![out])
}

/// The second block dimension scales the channels twice.
pub fn space2depth(inputs: &[Dims], params: &Parameters) -> Option<Vec<Dims>> {
    let input = first(inputs)?;
    let block = params.int_list("block_size")?;
    let (bh, bw) = match block.as_slice() {
        [bh, bw, ..] => (*bh, *bw),
        _ => return None,
    };
    let h = at(input, 1)?.checked_div(bh)?;
    let w = at(input, 2)?.checked_div(bw)?;
    let c = at(input, 3)?.checked_mul(bw)?.checked_mul(bw)?;
    Some(vec![vec![at(input, 0)?, h, w, c]])
}

pub fn split(inputs: &[Dims], params: &Parameters) -> Option<Vec<Dims>> {
    let input = first(inputs)?;
    let dim = axis(params.int("dim")?, input.len())?;
    let mut bounds = params.int_list("slices")?;
    bounds.sort_unstable();
    bounds.insert(0, 0);
    bounds.push(input[dim]);
    let outputs = bounds
        .windows(2)
        .map(|pair| {
            let mut shape = input.clone();
            shape[dim] = pair[1].checked_sub(pair[0])?;
            Some(shape)
        })
        .collect::<Option<Vec<Dims>>>()?;
    Some(outputs)
}

pub fn stack(inputs: &[Dims], params: &Parameters) -> Option<Vec<Dims>> {
    let mut out = first(inputs)?.clone();
    if out.as_slice() == [0] {
        out[0] = 1;
    } else {
        let a = params.int("axis").unwrap_or(0);
        let rank = out.len() as i64;
        let a = if a < 0 { a + rank + 1 } else { a };
        if !(0..=rank).contains(&a) {
            return None;
        }
        out.insert(a as usize, inputs.len() as i64);
    }
    Some(vec![out])
}

/// Strided slice with begin/end masks, new-axis and shrink-axis masks.
pub fn strided_slice(inputs: &[Dims], params: &Parameters) -> Option<Vec<Dims>> {
    let source = first(inputs)?;
    let mut input_shape = source.clone();
    let mut begin = params.int_list("slice_begin")?;
    let mut end = params.int_list("slice_end")?;
    let strides = params.int_list("slice_strides")?;
    let begin_mask = mask(params, "slice_begin_mask");
    let end_mask = mask(params, "slice_end_mask");
    let new_axis_mask = mask(params, "slice_new_axis_mask");
    let shrink_mask = mask(params, "slice_shrink_axis_mask");

    // masked entries take their default, marked as -1 first
    for (i, b) in begin.iter_mut().enumerate() {
        if bit(begin_mask, i) || *b == -1 {
            *b = 0;
        }
    }
    for (i, e) in end.iter_mut().enumerate() {
        if bit(end_mask, i) {
            *e = -1;
        }
    }

    if source.len() == end.len() {
        for (i, e) in end.iter_mut().enumerate() {
            if *e == -1 {
                *e = input_shape[i];
            }
        }
    } else if source.len() < end.len() && new_axis_mask != 0 {
        for i in 0..bit_len(new_axis_mask) {
            if bit(new_axis_mask, i) {
                let pos = i.min(input_shape.len());
                input_shape.insert(pos, 1);
            }
        }
        for (i, e) in end.iter_mut().enumerate() {
            if *e == -1 {
                *e = *input_shape.get(i)?;
            }
        }
    }

    // remaining negatives count from the end of their axis
    for (i, b) in begin.iter_mut().enumerate() {
        if let Some(&dim) = input_shape.get(i) {
            *b = clamp_index(*b, dim);
        }
    }
    for (i, e) in end.iter_mut().enumerate() {
        if let Some(&dim) = input_shape.get(i) {
            *e = clamp_index(*e, dim);
        }
    }

    let mut out = (0..begin.len())
        .map(|i| {
            let span = end.get(i)?.checked_sub(begin[i])?;
            let stride = *strides.get(i)?;
            div_ceil(span, stride).map(|n| n.max(0))
        })
        .collect::<Option<Dims>>()?;

    for i in (0..bit_len(shrink_mask)).rev() {
        if bit(shrink_mask, i) && i < out.len() {
            out.remove(i);
        }
    }

    if new_axis_mask != 0 {
        for i in 0..bit_len(new_axis_mask) {
            if !bit(new_axis_mask, i) {
                continue;
            }
            if source.len() == begin.len() {
                let pos = i.min(out.len());
                out.insert(pos, 1);
            } else if source.len() < begin.len() {
                *out.get_mut(i)? = 1;
            }
        }
    }

    Some(vec![out])
}

/// Python-style index into an axis of length `dim`, clamped to `[0, dim]`
fn clamp_index(index: i64, dim: i64) -> i64 {
    let index = if index < 0 { index + dim } else { index };
    index.clamp(0, dim.max(0))
}

/// Element count of a strided range, rounding toward the partial step
fn div_ceil(span: i64, stride: i64) -> Option<i64> {
    let q = span.checked_div(stride)?;
    let r = span.checked_rem(stride)?;
    if r != 0 && ((r > 0) == (stride > 0)) {
        Some(q + 1)
    } else {
        Some(q)
    }
}
