//!
//! Rust Firebird Client
//!
//! Array columns, transferred as whole slices
//!

use std::{cell::RefCell, rc::Rc, sync::Arc};

use ibpp_core::{
    convert::{self, Field, Native},
    ibase::{self, ISC_ARRAY_BOUND, ISC_ARRAY_DESC, ISC_QUAD},
    FbClient, FbError, FromValue, IntoValue, Status, WireType,
};

use crate::{database::Database, transaction::Transaction};

pub(crate) struct ArrayImpl {
    client: Arc<dyn FbClient>,
    id: ISC_QUAD,
    id_assigned: bool,
    desc: ISC_ARRAY_DESC,
    described: bool,
    element_type: Option<WireType>,
    element_size: usize,
    buffer: Vec<u8>,
    db: Option<Database>,
    tr: Option<Transaction>,
}

impl ArrayImpl {
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

    fn bounds(&self) -> &[ISC_ARRAY_BOUND] {
        let dims = (self.desc.array_desc_dimensions.max(0) as usize).min(16);
        &self.desc.array_desc_bounds[..dims]
    }

    /// Count of elements within the current bounds
    fn elements(&self) -> usize {
        self.bounds()
            .iter()
            .map(|b| (b.array_bound_upper as i32 - b.array_bound_lower as i32 + 1).max(0) as usize)
            .product()
    }

    fn alloc_buffer(&mut self) {
        self.buffer = vec![0; self.elements() * self.element_size];
    }

    fn field(&self, wire: WireType) -> Field {
        Field {
            wire,
            scale: self.desc.array_desc_scale as i16,
            length: self.desc.array_desc_length as usize,
        }
    }

    fn check_described(&self, origin: &'static str) -> Result<WireType, FbError> {
        match (self.described, self.element_type) {
            (true, Some(wire)) => Ok(wire),
            _ => Err(FbError::logic(origin, "Array description not set.")),
        }
    }

    fn charset(&self) -> ibpp_core::Charset {
        self.db.as_ref().map(|db| db.charset()).unwrap_or_default()
    }
}

/// An array column of a database
#[derive(Clone)]
pub struct Array(pub(crate) Rc<RefCell<ArrayImpl>>);

impl Array {
    /// Array of `db`, transferred in `tr`
    pub fn new(db: &Database, tr: &Transaction) -> Array {
        let array = Array(Rc::new(RefCell::new(ArrayImpl {
            client: db.client(),
            id: ISC_QUAD::default(),
            id_assigned: false,
            desc: ISC_ARRAY_DESC::default(),
            described: false,
            element_type: None,
            element_size: 0,
            buffer: vec![],
            db: None,
            tr: None,
        })));

        array.attach_database(db);
        array.attach_transaction(tr);

        array
    }

    pub fn attach_database(&self, db: &Database) {
        let previous = self.0.borrow_mut().db.replace(db.clone());
        if let Some(previous) = previous {
            previous.forget_array(&self.0);
        }
        db.attach_array(&self.0);
    }

    pub fn attach_transaction(&self, tr: &Transaction) {
        let previous = self.0.borrow_mut().tr.replace(tr.clone());
        if let Some(previous) = previous {
            previous.forget_array(&self.0);
        }
        tr.attach_array(&self.0);
    }

    pub fn detach_database(&self) -> Result<(), FbError> {
        let db = self.0.borrow_mut().db.take();

        match db {
            Some(db) => db.detach_array(&self.0),
            None => Err(FbError::logic(
                "Array::DetachDatabase",
                "No Database was attached.",
            )),
        }
    }

    pub fn detach_transaction(&self) -> Result<(), FbError> {
        let tr = self.0.borrow_mut().tr.take();

        match tr {
            Some(tr) => tr.detach_array(&self.0),
            None => Err(FbError::logic(
                "Array::DetachTransaction",
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

    /// Loads the shape of `table.column` and sizes the transfer buffer
    pub fn describe(&self, table: &str, column: &str) -> Result<(), FbError> {
        let mut a = self.0.borrow_mut();
        let (mut db, mut tr) = a.handles("Array::Describe")?;

        let a = &mut *a;
        let mut desc = ISC_ARRAY_DESC::default();
        let mut status = Status::default();
        a.client
            .array_lookup_bounds(&mut status, &mut db, &mut tr, table, column, &mut desc);
        status.check(
            a.client.as_ref(),
            "Array::Describe",
            "isc_array_lookup_bounds failed.",
        )?;

        let wire = WireType::from_blr(desc.array_desc_dtype)?;
        let mut size = desc.array_desc_length as usize;
        match desc.array_desc_dtype {
            ibase::blr_varying | ibase::blr_varying2 => size += 2,
            ibase::blr_cstring | ibase::blr_cstring2 => size += 1,
            _ => {}
        }

        a.desc = desc;
        a.element_type = Some(wire);
        a.element_size = size;
        a.described = true;
        a.alloc_buffer();

        log::debug!(
            "Described the array {}.{}: {} elements of {}",
            table,
            column,
            a.elements(),
            wire
        );

        Ok(())
    }

    /// Narrows the bounds of dimension `dim` (0-based)
    pub fn set_bounds(&self, dim: usize, low: i16, high: i16) -> Result<(), FbError> {
        let mut a = self.0.borrow_mut();
        a.check_described("Array::SetBounds")?;

        if dim >= a.bounds().len() {
            return Err(FbError::logic("Array::SetBounds", "Invalid dimension."));
        }
        if low > high {
            return Err(FbError::logic("Array::SetBounds", "Invalid bounds."));
        }

        let current = a.desc.array_desc_bounds[dim];
        if low < current.array_bound_lower || high > current.array_bound_upper {
            return Err(FbError::logic(
                "Array::SetBounds",
                "Invalid bounds. You can only narrow the bounds.",
            ));
        }

        a.desc.array_desc_bounds[dim] = ISC_ARRAY_BOUND {
            array_bound_lower: low,
            array_bound_upper: high,
        };
        a.alloc_buffer();

        Ok(())
    }

    pub fn dimensions(&self) -> Result<usize, FbError> {
        let a = self.0.borrow();
        a.check_described("Array::Dimensions")?;

        Ok(a.bounds().len())
    }

    /// Lower and upper bound of dimension `dim` (0-based)
    pub fn bounds(&self, dim: usize) -> Result<(i16, i16), FbError> {
        let a = self.0.borrow();
        a.check_described("Array::GetBounds")?;

        a.bounds()
            .get(dim)
            .map(|b| (b.array_bound_lower, b.array_bound_upper))
            .ok_or_else(|| FbError::logic("Array::GetBounds", "Invalid dimension."))
    }

    pub fn element_type(&self) -> Result<WireType, FbError> {
        self.0.borrow().check_described("Array::ElementType")
    }

    /// Bytes of one element in the transfer buffer
    pub fn element_size(&self) -> Result<usize, FbError> {
        let a = self.0.borrow();
        a.check_described("Array::ElementSize")?;

        Ok(a.element_size)
    }

    pub fn element_scale(&self) -> Result<i32, FbError> {
        let a = self.0.borrow();
        a.check_described("Array::ElementScale")?;

        Ok(-(a.desc.array_desc_scale as i32))
    }

    /// Count of elements within the current bounds
    pub fn elements(&self) -> usize {
        self.0.borrow().elements()
    }

    /// Points the array to an existing one, as read from a column
    pub fn set_id(&self, id: ISC_QUAD) -> Result<(), FbError> {
        let mut a = self.0.borrow_mut();
        a.id = id;
        a.id_assigned = !id.is_zero();

        Ok(())
    }

    /// Id of the array last written, to be stored in a column
    pub fn stored_id(&self) -> Result<ISC_QUAD, FbError> {
        let a = self.0.borrow();
        if a.id.is_zero() {
            return Err(FbError::logic("Array::GetId", "No Array Id is available."));
        }

        Ok(a.id)
    }

    /// Reads every element within the bounds. `out` must hold exactly that
    /// many elements
    pub fn read_to<T: FromValue>(&self, out: &mut [T]) -> Result<(), FbError> {
        let mut a = self.0.borrow_mut();
        let wire = a.check_described("Array::ReadTo")?;
        if !a.id_assigned {
            return Err(FbError::logic("Array::ReadTo", "Array Id not set."));
        }
        if out.len() != a.elements() {
            return Err(FbError::logic(
                "Array::ReadTo",
                "Wrong count of array elements",
            ));
        }
        let (mut db, mut tr) = a.handles("Array::ReadTo")?;

        let a = &mut *a;
        let mut len = a.buffer.len() as ibase::ISC_LONG;
        let mut status = Status::default();
        a.client.array_get_slice(
            &mut status,
            &mut db,
            &mut tr,
            &mut a.id,
            &a.desc,
            &mut a.buffer,
            &mut len,
        );
        status.check(
            a.client.as_ref(),
            "Array::ReadTo",
            "isc_array_get_slice failed.",
        )?;

        let field = a.field(wire);
        let charset = a.charset();

        for (chunk, item) in a.buffer.chunks_exact(a.element_size).zip(out.iter_mut()) {
            let native = decode_element(chunk, wire, field.length)?;
            let value = convert::load(&native, &field, T::KIND, &charset, "Array::ReadTo")?;

            *item = T::from_value(value)
                .ok_or_else(|| FbError::logic("Array::ReadTo", "Unexpected converted value"))?;
        }

        Ok(())
    }

    /// Writes every element within the bounds to a new array. `data` must
    /// hold exactly that many elements.
    ///
    /// The id is then forgotten, it must be stored in a column with
    /// [`Row::set_array`](crate::Row::set_array) and assigned again before
    /// reading.
    pub fn write_from<T: IntoValue + Clone>(&self, data: &[T]) -> Result<(), FbError> {
        let mut a = self.0.borrow_mut();
        let wire = a.check_described("Array::WriteFrom")?;
        if data.len() != a.elements() {
            return Err(FbError::logic(
                "Array::WriteFrom",
                "Wrong count of array elements",
            ));
        }
        let (mut db, mut tr) = a.handles("Array::WriteFrom")?;

        let field = a.field(wire);
        let charset = a.charset();
        let size = a.element_size;

        for (chunk, item) in a.buffer.chunks_exact_mut(size).zip(data.iter()) {
            let native = convert::store(item.clone().into_value(), &field, &charset, "Array::WriteFrom")?;
            encode_element(chunk, native)?;
        }

        let a = &mut *a;
        // A write always goes to a new array
        a.id = ISC_QUAD::default();
        a.id_assigned = false;

        let mut len = a.buffer.len() as ibase::ISC_LONG;
        let mut status = Status::default();
        a.client.array_put_slice(
            &mut status,
            &mut db,
            &mut tr,
            &mut a.id,
            &a.desc,
            &mut a.buffer,
            &mut len,
        );
        status.check(
            a.client.as_ref(),
            "Array::WriteFrom",
            "isc_array_put_slice failed.",
        )?;

        Ok(())
    }
}

impl std::fmt::Debug for Array {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let a = self.0.borrow();
        f.debug_struct("Array")
            .field("id", &a.id)
            .field("element_type", &a.element_type)
            .field("bounds", &a.bounds())
            .finish()
    }
}

fn short_element() -> FbError {
    FbError::protocol("Array::ReadTo", "Element shorter than its type")
}

/// Native value of one element of the slice buffer, in the host byte order
fn decode_element(chunk: &[u8], wire: WireType, length: usize) -> Result<Native, FbError> {
    macro_rules! ne {
        ($t: ty, $n: expr) => {
            <$t>::from_ne_bytes(
                chunk
                    .get(..$n)
                    .and_then(|b| b.try_into().ok())
                    .ok_or_else(short_element)?,
            )
        };
    }

    Ok(match wire {
        WireType::Text => Native::Text(chunk[..length.min(chunk.len())].to_vec()),
        // The slice calls hand varying elements as nul terminated strings
        WireType::Varying => {
            let end = chunk.iter().position(|b| *b == 0).unwrap_or(chunk.len());
            Native::Varying(chunk[..end.min(length)].to_vec())
        }
        WireType::Short => Native::Short(ne!(i16, 2)),
        WireType::Long => Native::Long(ne!(i32, 4)),
        WireType::Int64 => Native::Int64(ne!(i64, 8)),
        WireType::Float => Native::Float(ne!(f32, 4)),
        WireType::Double | WireType::DFloat => Native::Double(ne!(f64, 8)),
        WireType::Date => Native::Date(ne!(i32, 4)),
        WireType::Time => Native::Time(ne!(u32, 4)),
        WireType::Timestamp => {
            let date = ne!(i32, 4);
            let time = u32::from_ne_bytes(
                chunk
                    .get(4..8)
                    .and_then(|b| b.try_into().ok())
                    .ok_or_else(short_element)?,
            );
            Native::Timestamp(ibase::ISC_TIMESTAMP {
                timestamp_date: date,
                timestamp_time: time,
            })
        }
        WireType::Boolean => Native::Boolean(chunk.first().copied().unwrap_or(0) != 0),
        WireType::Blob | WireType::Array => {
            return Err(FbError::logic(
                "Array::ReadTo",
                "Arrays of blobs or arrays are not supported",
            ))
        }
    })
}

/// Writes one element to the slice buffer, in the host byte order
fn encode_element(chunk: &mut [u8], native: Native) -> Result<(), FbError> {
    fn put(chunk: &mut [u8], bytes: &[u8]) -> Result<(), FbError> {
        chunk
            .get_mut(..bytes.len())
            .ok_or_else(|| FbError::protocol("Array::WriteFrom", "Element shorter than its type"))?
            .copy_from_slice(bytes);
        Ok(())
    }

    chunk.iter_mut().for_each(|b| *b = 0);

    match native {
        Native::Text(bytes) => {
            let n = bytes.len().min(chunk.len());
            chunk[..n].copy_from_slice(&bytes[..n]);
        }
        Native::Varying(bytes) => {
            // Room is left for the terminator
            let n = bytes.len().min(chunk.len().saturating_sub(1));
            chunk[..n].copy_from_slice(&bytes[..n]);
        }
        Native::Short(v) => put(chunk, &v.to_ne_bytes())?,
        Native::Long(v) => put(chunk, &v.to_ne_bytes())?,
        Native::Int64(v) => put(chunk, &v.to_ne_bytes())?,
        Native::Float(v) => put(chunk, &v.to_ne_bytes())?,
        Native::Double(v) => put(chunk, &v.to_ne_bytes())?,
        Native::Date(v) => put(chunk, &v.to_ne_bytes())?,
        Native::Time(v) => put(chunk, &v.to_ne_bytes())?,
        Native::Timestamp(ts) => {
            put(chunk, &ts.timestamp_date.to_ne_bytes())?;
            put(&mut chunk[4..], &ts.timestamp_time.to_ne_bytes())?;
        }
        Native::Boolean(b) => put(chunk, &[b as u8])?,
        Native::Blob(_) | Native::Array(_) => {
            return Err(FbError::logic(
                "Array::WriteFrom",
                "Arrays of blobs or arrays are not supported",
            ))
        }
    }

    Ok(())
}
