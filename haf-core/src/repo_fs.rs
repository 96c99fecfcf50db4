use parking_lot::Mutex;
use std::path::Path;

use crate::domain::FileRow;
use crate::error::Result;
use crate::read::opened::HafReader;
use crate::repo::ArchiveRepo;
use crate::stats::ArchiveStats;

pub struct FsArchiveRepo {
    // body reads seek the shared handle
    reader: Mutex<HafReader>,
}

impl FsArchiveRepo {
    pub fn open(archive: &Path) -> Result<Self> {
        Ok(Self {
            reader: Mutex::new(HafReader::open(archive)?),
        })
    }
}

impl ArchiveRepo for FsArchiveRepo {
    fn list_files(&self) -> Result<Vec<FileRow>> {
        Ok(self.reader.lock().records().iter().map(FileRow::from).collect())
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let mut reader = self.reader.lock();
        let rec = reader.find(name)?.clone();
        reader.decode(&rec)
    }

    fn stats(&self) -> Result<ArchiveStats> {
        Ok(ArchiveStats::from_records(self.reader.lock().records()))
    }
}
