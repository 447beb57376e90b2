//! Splitting interleaved images into planes and merging them back.

use crate::color::{ColorInfo, Gray};
use crate::image::buffer::{with_depth, DynView, DynViewMut};
use crate::image::{Image, ImageView, ImageViewMut, Primitive, Region};
use crate::parallel::{ParallelProcessor, PatchDestination};
use crate::util::{PatchVisionError, PatchVisionResult};

/// Each plane is split into the same row stripes; part `i` holds stripe `i`
/// of every plane.
impl PatchDestination for Vec<Image> {
    type Patch<'a> = Vec<DynViewMut<'a>>;

    fn split_patches<'a>(
        &'a mut self,
        patches: &[Region],
    ) -> PatchVisionResult<Vec<Vec<DynViewMut<'a>>>> {
        let mut parts: Vec<Vec<DynViewMut<'a>>> =
            (0..patches.len()).map(|_| Vec::with_capacity(self.len())).collect();
        for plane in self.iter_mut() {
            let stripes = plane.split_patches(patches)?;
            for (part, stripe) in parts.iter_mut().zip(stripes) {
                part.push(stripe);
            }
        }
        Ok(parts)
    }
}

pub(crate) fn split_channels(image: &Image) -> PatchVisionResult<Vec<Image>> {
    let plane_info = ColorInfo::get::<Gray>(image.depth())?;
    let (width, height, channels) = (image.width(), image.height(), image.channels());
    let processor = ParallelProcessor::new(
        image.size(),
        || {
            (0..channels)
                .map(|_| Image::new(plane_info, width, height))
                .collect::<PatchVisionResult<Vec<Image>>>()
        },
        |src: &Image, planes: Vec<DynViewMut<'_>>, region: Region| {
            let view = src.view().roi(region)?;
            with_depth!(view, DynView, typed => split_patch(typed, planes))
        },
    );
    processor.process(image)
}

fn split_patch<T: Primitive>(
    src: ImageView<'_, T>,
    planes: Vec<DynViewMut<'_>>,
) -> PatchVisionResult<()> {
    let channels = src.channels();
    for (c, plane) in planes.into_iter().enumerate() {
        let mut plane: ImageViewMut<'_, T> = plane.typed("split channels")?;
        for (y, row) in src.rows().enumerate() {
            if let Some(out) = plane.row_mut(y) {
                for (x, value) in out.iter_mut().enumerate() {
                    *value = row[x * channels + c];
                }
            }
        }
    }
    Ok(())
}

pub(crate) fn merge_channels(
    planes: &[Image],
    info: &'static ColorInfo,
) -> PatchVisionResult<Image> {
    if planes.len() != info.channels() {
        return Err(PatchVisionError::ChannelCountMismatch {
            expected: info.channels(),
            got: planes.len(),
        });
    }
    let first = &planes[0];
    for plane in planes {
        if plane.channels() != 1 {
            return Err(PatchVisionError::ChannelCountMismatch {
                expected: 1,
                got: plane.channels(),
            });
        }
        if plane.size() != first.size() {
            return Err(PatchVisionError::SizeMismatch {
                expected_width: first.width(),
                expected_height: first.height(),
                width: plane.width(),
                height: plane.height(),
            });
        }
        if plane.depth() != info.depth() {
            return Err(PatchVisionError::UnsupportedChannelType {
                operation: "merge channels",
                depth: plane.depth(),
            });
        }
    }

    let (width, height) = (first.width(), first.height());
    let processor = ParallelProcessor::new(
        first.size(),
        || Image::new(info, width, height),
        |src: &[Image], dst: DynViewMut<'_>, region: Region| {
            let views = src
                .iter()
                .map(|plane| plane.view().roi(region))
                .collect::<PatchVisionResult<Vec<DynView<'_>>>>()?;
            with_depth!(dst, DynViewMut, typed => merge_patch(&views, typed))
        },
    );
    processor.process(planes)
}

fn merge_patch<T: Primitive>(
    planes: &[DynView<'_>],
    mut dst: ImageViewMut<'_, T>,
) -> PatchVisionResult<()> {
    let channels = dst.channels();
    for (c, plane) in planes.iter().enumerate() {
        let plane: ImageView<'_, T> = plane.typed("merge channels")?;
        for (y, row) in plane.rows().enumerate() {
            if let Some(out) = dst.row_mut(y) {
                for (x, &value) in row.iter().enumerate() {
                    out[x * channels + c] = value;
                }
            }
        }
    }
    Ok(())
}
