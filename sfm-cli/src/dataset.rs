use crate::Error;
use log::*;
use sfm_features::Frame;
use std::{
    cmp::Ordering,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

/// The file naming convention of an image directory.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Dataset {
    /// Right camera images named `<prefix>_<camera>_<timestamp>_right.jpg`, ordered by timestamp.
    Malaga,
    /// Images ending in `.JPG`, ordered by file name.
    Colmap,
}

impl FromStr for Dataset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "malaga" => Ok(Self::Malaga),
            "colmap" => Ok(Self::Colmap),
            _ => Err(Error::UnknownDataset(s.to_owned())),
        }
    }
}

impl Dataset {
    /// Keeps the file names that belong to the dataset and returns them in frame order.
    pub fn order<S: AsRef<str>>(self, names: impl IntoIterator<Item = S>) -> Vec<String> {
        match self {
            Self::Malaga => {
                let mut stamped: Vec<(f64, String)> = names
                    .into_iter()
                    .map(|name| name.as_ref().to_owned())
                    .filter(|name| name.ends_with("right.jpg"))
                    .filter_map(|name| match malaga_timestamp(&name) {
                        Some(stamp) => Some((stamp, name)),
                        None => {
                            warn!("ignoring {}: no timestamp in the third field", name);
                            None
                        }
                    })
                    .collect();
                stamped.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
                stamped.into_iter().map(|(_, name)| name).collect()
            }
            Self::Colmap => {
                let mut names: Vec<String> = names
                    .into_iter()
                    .map(|name| name.as_ref().to_owned())
                    .filter(|name| name.ends_with(".JPG"))
                    .collect();
                names.sort();
                names
            }
        }
    }

    /// Lists `dir` and returns the dataset's image paths in frame order.
    pub fn paths(self, dir: &Path) -> Result<Vec<PathBuf>, Error> {
        let mut names = vec![];
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_owned());
            }
        }
        Ok(self
            .order(names)
            .into_iter()
            .map(|name| dir.join(name))
            .collect())
    }
}

fn malaga_timestamp(name: &str) -> Option<f64> {
    name.split('_').nth(2)?.parse().ok()
}

/// Decodes an image file into the gray and color planes of a frame.
pub fn load_frame(path: &Path) -> Result<Frame, Error> {
    debug!("loading {}", path.display());
    let image = image::open(path)?;
    Ok(Frame::from_dynamic(&image))
}

/// Yields the successful items until the first error, which is stored in `error`.
///
/// Nothing past the first error is pulled from `items`.
pub fn until_error<'a, T, E, I>(items: I, error: &'a mut Option<E>) -> impl Iterator<Item = T> + 'a
where
    T: 'a,
    I: Iterator<Item = Result<T, E>> + 'a,
{
    items.map_while(move |item| match item {
        Ok(item) => Some(item),
        Err(e) => {
            *error = Some(e);
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn until_error_stops_at_the_first_error() {
        let pulled = Cell::new(0);
        let items = [Ok(1), Ok(2), Err("bad"), Ok(4), Err("worse")]
            .into_iter()
            .inspect(|_| pulled.set(pulled.get() + 1));
        let mut error = None;
        let taken: Vec<i32> = until_error(items, &mut error).collect();
        assert_eq!(taken, vec![1, 2]);
        assert_eq!(error, Some("bad"));
        assert_eq!(pulled.get(), 3);
    }

    #[test]
    fn until_error_passes_everything_without_errors() {
        let mut error: Option<&str> = None;
        let taken: Vec<i32> = until_error([Ok(1), Ok(2)].into_iter(), &mut error).collect();
        assert_eq!(taken, vec![1, 2]);
        assert!(error.is_none());
    }

    #[test]
    fn dataset_names_parse() {
        assert_eq!("malaga".parse::<Dataset>().unwrap(), Dataset::Malaga);
        assert_eq!("colmap".parse::<Dataset>().unwrap(), Dataset::Colmap);
        assert!(matches!(
            "kitti".parse::<Dataset>(),
            Err(Error::UnknownDataset(name)) if name == "kitti"
        ));
    }

    #[test]
    fn malaga_orders_by_timestamp() {
        let names = [
            "img_CAMERA1_1261230001.080210_right.jpg",
            "img_CAMERA1_1261230001.080210_left.jpg",
            "img_CAMERA1_999.5_right.jpg",
            "img_CAMERA1_1261229999.930000_right.jpg",
            "notes.txt",
        ];
        assert_eq!(
            Dataset::Malaga.order(names),
            vec![
                "img_CAMERA1_999.5_right.jpg",
                "img_CAMERA1_1261229999.930000_right.jpg",
                "img_CAMERA1_1261230001.080210_right.jpg",
            ]
        );
    }

    #[test]
    fn malaga_ignores_names_without_timestamp() {
        assert!(Dataset::Malaga.order(["img_right.jpg"]).is_empty());
    }

    #[test]
    fn colmap_orders_by_name() {
        let names = ["P1180220.JPG", "P1180218.JPG", "P1180219.jpg", "P1180221.JPG"];
        assert_eq!(
            Dataset::Colmap.order(names),
            vec!["P1180218.JPG", "P1180220.JPG", "P1180221.JPG"]
        );
    }
}
