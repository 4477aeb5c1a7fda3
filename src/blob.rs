//!
//! Rust Firebird Client
//!
//! Segmented blobs
//!

use std::{cell::RefCell, rc::Rc, sync::Arc};

use ibpp_core::{
    ibase::{self, isc_blob_handle, ISC_QUAD},
    FbClient, FbError, ResultBuffer, Status,
};

use crate::{database::Database, transaction::Transaction};

/// Largest segment the engine transfers in one call
pub const MAX_SEGMENT: usize = 65535;

/// Segment size used by [`Blob::save`]
const SAVE_SEGMENT: usize = 32767;

/// Sizes reported by the engine for an open blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlobInfo {
    /// Total length in bytes
    pub size: i32,
    pub largest_segment: i32,
    pub segments: i32,
}

pub(crate) struct BlobImpl {
    client: Arc<dyn FbClient>,
    handle: isc_blob_handle,
    id: ISC_QUAD,
    id_assigned: bool,
    write_mode: bool,
    db: Option<Database>,
    tr: Option<Transaction>,
}

impl BlobImpl {
    fn handles(
        &self,
        origin: &'static str,
    ) -> Result<(ibase::isc_db_handle, ibase::isc_tr_handle), FbError> {
        let db = self
            .db
            .as_ref()
            .ok_or_else(|| FbError::logic(origin, "No Database is attached."))?;
        let tr = self
            .tr
            .as_ref()
            .ok_or_else(|| FbError::logic(origin, "No Transaction is attached."))?;

        Ok((db.handle(), tr.handle()))
    }

    fn close(&mut self) -> Result<(), FbError> {
        if self.handle == 0 {
            return Ok(());
        }

        let mut status = Status::default();
        self.client.close_blob(&mut status, &mut self.handle);
        status.check(self.client.as_ref(), "Blob::Close", "isc_close_blob failed.")?;
        self.handle = 0;

        Ok(())
    }

    fn cancel(&mut self) -> Result<(), FbError> {
        if self.handle == 0 {
            return Ok(());
        }
        if !self.write_mode {
            return Err(FbError::logic(
                "Blob::Cancel",
                "We can't cancel a Blob opened for read.",
            ));
        }

        let mut status = Status::default();
        self.client.cancel_blob(&mut status, &mut self.handle);
        status.check(self.client.as_ref(), "Blob::Cancel", "isc_cancel_blob failed.")?;
        self.handle = 0;
        self.id_assigned = false;

        Ok(())
    }

    /// Cancels a blob being written, closes one being read
    fn release(&mut self) -> Result<(), FbError> {
        if self.write_mode {
            self.cancel()
        } else {
            self.close()
        }
    }
}

impl Drop for BlobImpl {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::warn!("Blob cleanup failed: {}", e);
        }
    }
}

/// A blob of a database, read or written in segments
#[derive(Clone)]
pub struct Blob(pub(crate) Rc<RefCell<BlobImpl>>);

impl Blob {
    /// Blob of `db`, transferred in `tr`
    pub fn new(db: &Database, tr: &Transaction) -> Blob {
        let blob = Blob(Rc::new(RefCell::new(BlobImpl {
            client: db.client(),
            handle: 0,
            id: ISC_QUAD::default(),
            id_assigned: false,
            write_mode: false,
            db: None,
            tr: None,
        })));

        blob.attach_database(db);
        blob.attach_transaction(tr);

        blob
    }

    pub fn attach_database(&self, db: &Database) {
        let previous = self.0.borrow_mut().db.replace(db.clone());
        if let Some(previous) = previous {
            previous.forget_blob(&self.0);
        }
        db.attach_blob(&self.0);
    }

    pub fn attach_transaction(&self, tr: &Transaction) {
        let previous = self.0.borrow_mut().tr.replace(tr.clone());
        if let Some(previous) = previous {
            previous.forget_blob(&self.0);
        }
        tr.attach_blob(&self.0);
    }

    /// Releases the blob and leaves its database
    pub fn detach_database(&self) -> Result<(), FbError> {
        let db = {
            let mut b = self.0.borrow_mut();
            b.release()?;
            b.db.take()
        };

        match db {
            Some(db) => db.detach_blob(&self.0),
            None => Err(FbError::logic(
                "Blob::DetachDatabase",
                "No Database was attached.",
            )),
        }
    }

    /// Releases the blob and leaves its transaction
    pub fn detach_transaction(&self) -> Result<(), FbError> {
        let tr = {
            let mut b = self.0.borrow_mut();
            b.release()?;
            b.tr.take()
        };

        match tr {
            Some(tr) => tr.detach_blob(&self.0),
            None => Err(FbError::logic(
                "Blob::DetachTransaction",
                "No Transaction was attached.",
            )),
        }
    }

    pub fn database(&self) -> Option<Database> {
        self.0.borrow().db.clone()
    }

    pub fn transaction(&self) -> Option<Transaction> {
        self.0.borrow().tr.clone()
    }

    /// Creates a new blob, opened for write
    pub fn create(&self) -> Result<(), FbError> {
        let mut b = self.0.borrow_mut();
        if b.handle != 0 {
            return Err(FbError::logic("Blob::Create", "Blob already opened."));
        }
        let (mut db, mut tr) = b.handles("Blob::Create")?;

        let b = &mut *b;
        let mut status = Status::default();
        b.client
            .create_blob2(&mut status, &mut db, &mut tr, &mut b.handle, &mut b.id, &[]);
        status.check(b.client.as_ref(), "Blob::Create", "isc_create_blob2 failed.")?;

        b.id_assigned = true;
        b.write_mode = true;

        Ok(())
    }

    /// Opens the blob of the assigned id for read
    pub fn open(&self) -> Result<(), FbError> {
        let mut b = self.0.borrow_mut();
        if b.handle != 0 {
            return Err(FbError::logic("Blob::Open", "Blob already opened."));
        }
        if !b.id_assigned {
            return Err(FbError::logic("Blob::Open", "Blob Id is not assigned."));
        }
        let (mut db, mut tr) = b.handles("Blob::Open")?;

        let b = &mut *b;
        let mut status = Status::default();
        b.client
            .open_blob2(&mut status, &mut db, &mut tr, &mut b.handle, &mut b.id, &[]);
        status.check(b.client.as_ref(), "Blob::Open", "isc_open_blob2 failed.")?;

        b.write_mode = false;

        Ok(())
    }

    pub fn close(&self) -> Result<(), FbError> {
        self.0.borrow_mut().close()
    }

    /// Discards a blob being written
    pub fn cancel(&self) -> Result<(), FbError> {
        self.0.borrow_mut().cancel()
    }

    pub fn is_open(&self) -> bool {
        self.0.borrow().handle != 0
    }

    /// Reads the next segment, or part of it. Returns 0 at the end of the blob
    pub fn read(&self, buffer: &mut [u8]) -> Result<usize, FbError> {
        let mut b = self.0.borrow_mut();
        if b.handle == 0 {
            return Err(FbError::logic("Blob::Read", "The Blob is not opened"));
        }
        if b.write_mode {
            return Err(FbError::logic(
                "Blob::Read",
                "Can't read from Blob opened for write",
            ));
        }
        if buffer.is_empty() || buffer.len() > MAX_SEGMENT {
            return Err(FbError::logic(
                "Blob::Read",
                "Invalid segment size (max 64Kb-1)",
            ));
        }

        let b = &mut *b;
        let mut status = Status::default();
        let mut actual = 0;
        let result = b
            .client
            .get_segment(&mut status, &mut b.handle, &mut actual, buffer);

        if result == ibase::isc_segstr_eof || status.engine_code() == ibase::isc_segstr_eof {
            return Ok(0);
        }
        // A partial segment is not an error
        if result != ibase::isc_segment && status.engine_code() != ibase::isc_segment {
            status.check(b.client.as_ref(), "Blob::Read", "isc_get_segment failed.")?;
        }

        Ok(actual as usize)
    }

    /// Writes one segment
    pub fn write(&self, data: &[u8]) -> Result<(), FbError> {
        let mut b = self.0.borrow_mut();
        if b.handle == 0 {
            return Err(FbError::logic("Blob::Write", "The Blob is not opened"));
        }
        if !b.write_mode {
            return Err(FbError::logic(
                "Blob::Write",
                "Can't write to Blob opened for read",
            ));
        }
        if data.is_empty() || data.len() > MAX_SEGMENT {
            return Err(FbError::logic(
                "Blob::Write",
                "Invalid segment size (max 64Kb-1)",
            ));
        }

        let b = &mut *b;
        let mut status = Status::default();
        b.client.put_segment(&mut status, &mut b.handle, data);
        status.check(b.client.as_ref(), "Blob::Write", "isc_put_segment failed.")
    }

    /// Size, largest segment and segment count of the open blob
    pub fn info(&self) -> Result<BlobInfo, FbError> {
        let mut b = self.0.borrow_mut();
        if b.handle == 0 {
            return Err(FbError::logic("Blob::Info", "The Blob is not opened"));
        }

        let items = [
            ibase::isc_info_blob_total_length,
            ibase::isc_info_blob_max_segment,
            ibase::isc_info_blob_num_segments,
            ibase::isc_info_end,
        ];
        let mut rb = ResultBuffer::new(100);

        let b = &mut *b;
        let mut status = Status::default();
        b.client
            .blob_info(&mut status, &mut b.handle, &items, rb.as_mut_bytes());
        status.check(b.client.as_ref(), "Blob::Info", "isc_blob_info failed.")?;

        Ok(BlobInfo {
            size: rb.get_int(ibase::isc_info_blob_total_length)?,
            largest_segment: rb.get_int(ibase::isc_info_blob_max_segment)?,
            segments: rb.get_int(ibase::isc_info_blob_num_segments)?,
        })
    }

    /// Creates a new blob holding `data`
    pub fn save(&self, data: &[u8]) -> Result<(), FbError> {
        if self.is_open() {
            return Err(FbError::logic("Blob::Save", "Blob already opened."));
        }

        self.create()?;
        for segment in data.chunks(SAVE_SEGMENT) {
            self.write(segment)?;
        }
        self.close()
    }

    /// Creates a new blob holding `text`, encoded in the database charset
    pub fn save_str(&self, text: &str) -> Result<(), FbError> {
        let charset = self.charset("Blob::Save")?;
        let bytes = charset.encode(text)?;

        self.save(&bytes)
    }

    /// Whole content of the blob
    pub fn load(&self) -> Result<Vec<u8>, FbError> {
        if self.is_open() {
            return Err(FbError::logic("Blob::Load", "Blob already opened."));
        }

        self.open()?;

        let mut data = vec![0; SAVE_SEGMENT + 1];
        let mut len = 0;
        loop {
            if len == data.len() {
                data.resize(data.len() * 2, 0);
            }

            let end = data.len().min(len + MAX_SEGMENT);
            let read = self.read(&mut data[len..end])?;
            if read == 0 {
                break;
            }
            len += read;
        }
        data.truncate(len);

        self.close()?;

        Ok(data)
    }

    /// Whole content of the blob, decoded from the database charset
    pub fn load_string(&self) -> Result<String, FbError> {
        let charset = self.charset("Blob::Load")?;
        let bytes = self.load()?;

        charset.decode(bytes.as_slice())
    }

    fn charset(&self, origin: &'static str) -> Result<ibpp_core::Charset, FbError> {
        self.0
            .borrow()
            .db
            .as_ref()
            .map(|db| db.charset())
            .ok_or_else(|| FbError::logic(origin, "No Database is attached."))
    }

    /// Points the blob to an existing one, as read from a column
    pub fn set_id(&self, id: ISC_QUAD) -> Result<(), FbError> {
        let mut b = self.0.borrow_mut();
        if b.handle != 0 {
            return Err(FbError::logic(
                "Blob::SetId",
                "Can't set Id on an opened Blob.",
            ));
        }

        b.id = id;
        b.id_assigned = !id.is_zero();

        Ok(())
    }

    pub fn id(&self) -> Result<ISC_QUAD, FbError> {
        let b = self.0.borrow();
        if !b.id_assigned {
            return Err(FbError::logic("Blob::GetId", "No Blob Id is assigned."));
        }

        Ok(b.id)
    }
}

impl std::fmt::Debug for Blob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let b = self.0.borrow();
        f.debug_struct("Blob")
            .field("handle", &b.handle)
            .field("id", &b.id)
            .field("write_mode", &b.write_mode)
            .finish()
    }
}
