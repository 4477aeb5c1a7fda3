//!
//! Rust Firebird Client
//!
//! Parameters and columns of a statement, with the native buffers the
//! engine reads from and writes to
//!

use std::{os::raw::c_char, ptr};

use ibpp_core::{
    convert::{self, Field, Native},
    err_type_conv, ibase, Charset, FbError, FromValue, IntoValue, SqlDataType, Value, ValueKind, WireType,
    XSqlDa, MAX_NAME_LENGTH,
};

use crate::{array::Array, blob::Blob, database::Database, transaction::Transaction};

/// Storage of one slot, pointed to by the `sqldata` of its XSQLVAR
#[derive(Debug, Clone)]
enum SlotData {
    /// Fixed length, padded with spaces
    Text(Box<[u8]>),
    /// 2 bytes length followed by the bytes
    Varying(Box<[u8]>),
    Short(Box<i16>),
    Long(Box<i32>),
    Int64(Box<i64>),
    Float(Box<f32>),
    Double(Box<f64>),
    Date(Box<ibase::ISC_DATE>),
    Time(Box<ibase::ISC_TIME>),
    Timestamp(Box<ibase::ISC_TIMESTAMP>),
    BlobId(Box<ibase::ISC_QUAD>),
    ArrayId(Box<ibase::ISC_QUAD>),
    Boolean(Box<i8>),
}

use SlotData::*;

impl SlotData {
    fn alloc(wire: WireType, sqllen: i16) -> Self {
        let len = sqllen.max(0) as usize;

        match wire {
            WireType::Text => Text(vec![b' '; len].into_boxed_slice()),
            WireType::Varying => Varying(vec![0; len + 2].into_boxed_slice()),
            WireType::Short => Short(Box::new(0)),
            WireType::Long => Long(Box::new(0)),
            WireType::Int64 => Int64(Box::new(0)),
            WireType::Float => Float(Box::new(0.0)),
            WireType::Double | WireType::DFloat => Double(Box::new(0.0)),
            WireType::Date => Date(Box::new(0)),
            WireType::Time => Time(Box::new(0)),
            WireType::Timestamp => Timestamp(Box::new(Default::default())),
            WireType::Blob => BlobId(Box::new(Default::default())),
            WireType::Array => ArrayId(Box::new(Default::default())),
            WireType::Boolean => Boolean(Box::new(0)),
        }
    }

    fn as_mut_ptr(&mut self) -> *mut c_char {
        match self {
            Text(b) | Varying(b) => b.as_mut_ptr() as _,
            Short(v) => &mut **v as *mut _ as _,
            Long(v) => &mut **v as *mut _ as _,
            Int64(v) => &mut **v as *mut _ as _,
            Float(v) => &mut **v as *mut _ as _,
            Double(v) => &mut **v as *mut _ as _,
            Date(v) => &mut **v as *mut _ as _,
            Time(v) => &mut **v as *mut _ as _,
            Timestamp(v) => &mut **v as *mut _ as _,
            BlobId(v) | ArrayId(v) => &mut **v as *mut _ as _,
            Boolean(v) => &mut **v as *mut _ as _,
        }
    }

    fn read(&self) -> Native {
        match self {
            Text(b) => Native::Text(b.to_vec()),
            Varying(b) => {
                let len = i16::from_ne_bytes([b[0], b[1]]).max(0) as usize;
                let data = &b[2..];
                Native::Varying(data[..len.min(data.len())].to_vec())
            }
            Short(v) => Native::Short(**v),
            Long(v) => Native::Long(**v),
            Int64(v) => Native::Int64(**v),
            Float(v) => Native::Float(**v),
            Double(v) => Native::Double(**v),
            Date(v) => Native::Date(**v),
            Time(v) => Native::Time(**v),
            Timestamp(v) => Native::Timestamp(**v),
            BlobId(v) => Native::Blob(**v),
            ArrayId(v) => Native::Array(**v),
            Boolean(v) => Native::Boolean(**v != 0),
        }
    }

    fn write(&mut self, native: Native) -> Result<(), FbError> {
        match (self, native) {
            (Text(b), Native::Text(bytes)) => {
                b.fill(b' ');
                let len = bytes.len().min(b.len());
                b[..len].copy_from_slice(&bytes[..len]);
            }
            (Varying(b), Native::Varying(bytes)) => {
                let len = bytes.len().min(b.len() - 2);
                b[..2].copy_from_slice(&(len as i16).to_ne_bytes());
                b[2..2 + len].copy_from_slice(&bytes[..len]);
            }
            (Short(v), Native::Short(n)) => **v = n,
            (Long(v), Native::Long(n)) => **v = n,
            (Int64(v), Native::Int64(n)) => **v = n,
            (Float(v), Native::Float(n)) => **v = n,
            (Double(v), Native::Double(n)) => **v = n,
            (Date(v), Native::Date(n)) => **v = n,
            (Time(v), Native::Time(n)) => **v = n,
            (Timestamp(v), Native::Timestamp(n)) => **v = n,
            (BlobId(v), Native::Blob(n)) => **v = n,
            (ArrayId(v), Native::Array(n)) => **v = n,
            (Boolean(v), Native::Boolean(n)) => **v = n as i8,
            _ => {
                return Err(FbError::logic(
                    "Row::Set",
                    "Value doesn't match the column buffer",
                ))
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Slot {
    data: SlotData,
    /// Only nullable slots have an indicator
    null: Option<Box<i16>>,
    wire: WireType,
    /// Set since the row was allocated
    updated: bool,
}

impl Slot {
    fn is_null(&self) -> bool {
        self.null.as_ref().map_or(false, |n| **n < 0)
    }

    fn null_ptr(&mut self) -> *mut i16 {
        self.null
            .as_mut()
            .map_or(ptr::null_mut(), |n| &mut **n as *mut i16)
    }
}

/// Database and transaction used to transfer the blobs of a row
#[derive(Clone)]
pub(crate) struct RowContext {
    pub db: Database,
    pub tr: Transaction,
}

/// The parameters or the columns of a statement.
///
/// Indexes are 1-based.
pub struct Row {
    xsqlda: XSqlDa,
    slots: Vec<Slot>,
    charset: Charset,
    context: Option<RowContext>,
}

impl Row {
    /// Row with room for `len` described slots, nothing allocated yet
    pub(crate) fn new(
        len: i16,
        charset: Charset,
        context: Option<RowContext>,
    ) -> Result<Self, FbError> {
        Ok(Row {
            xsqlda: XSqlDa::new(len.max(1))?,
            slots: vec![],
            charset,
            context,
        })
    }

    /// Discards the descriptor area and the buffers, making room for `len` slots
    pub(crate) fn resize(&mut self, len: i16) -> Result<(), FbError> {
        self.slots.clear();
        self.xsqlda = XSqlDa::new(len.max(1))?;

        Ok(())
    }

    pub(crate) fn xsqlda(&self) -> &XSqlDa {
        &self.xsqlda
    }

    pub(crate) fn xsqlda_mut(&mut self) -> &mut XSqlDa {
        &mut self.xsqlda
    }

    /// The engine described more slots than there is room for
    pub(crate) fn needs_resize(&self) -> bool {
        self.xsqlda.sqld() > self.xsqlda.sqln()
    }

    /// Allocates the buffers of every described slot, and the null
    /// indicators of the nullable ones
    pub(crate) fn allocate_variables(&mut self) -> Result<(), FbError> {
        let count = self.xsqlda.sqld().max(0) as usize;
        let mut slots = Vec::with_capacity(count);

        for var in self.xsqlda.vars_mut().iter_mut().take(count) {
            let wire = WireType::from_sqltype(var.sqltype)?;
            if wire == WireType::Boolean {
                var.sqllen = 1;
            }

            let mut slot = Slot {
                data: SlotData::alloc(wire, var.sqllen),
                null: if var.is_nullable() {
                    Some(Box::new(0))
                } else {
                    None
                },
                wire,
                updated: false,
            };
            var.sqldata = slot.data.as_mut_ptr();
            var.sqlind = slot.null_ptr();

            slots.push(slot);
        }

        self.slots = slots;

        Ok(())
    }

    /// Releases the buffers. The row has no slots afterwards
    pub fn free(&mut self) {
        for var in self.xsqlda.vars_mut() {
            var.sqldata = ptr::null_mut();
            var.sqlind = ptr::null_mut();
        }
        self.xsqlda.set_sqld(0);
        self.slots.clear();
    }

    /// Deep copy, with its own buffers
    pub fn try_clone(&self) -> Result<Row, FbError> {
        let mut xsqlda = self.xsqlda.try_clone()?;
        let mut slots = self.slots.clone();

        for (var, slot) in xsqlda.vars_mut().iter_mut().zip(slots.iter_mut()) {
            var.sqldata = slot.data.as_mut_ptr();
            var.sqlind = slot.null_ptr();
        }

        Ok(Row {
            xsqlda,
            slots,
            charset: self.charset.clone(),
            context: self.context.clone(),
        })
    }

    /// Count of slots
    pub fn columns(&self) -> usize {
        self.slots.len()
    }

    fn slot_index(&self, index: usize, origin: &'static str) -> Result<usize, FbError> {
        if index < 1 || index > self.slots.len() {
            return Err(FbError::logic(origin, "Variable index out of range."));
        }

        Ok(index - 1)
    }

    fn var(&self, i: usize) -> &ibase::XSQLVAR {
        &self.xsqlda.vars()[i]
    }

    fn field(&self, i: usize) -> Field {
        let var = self.var(i);

        Field {
            wire: self.slots[i].wire,
            scale: var.sqlscale,
            length: var.sqllen.max(0) as usize,
        }
    }

    fn context(&self, origin: &'static str) -> Result<&RowContext, FbError> {
        self.context
            .as_ref()
            .ok_or_else(|| FbError::logic(origin, "No database and transaction to transfer the blob."))
    }

    pub fn is_null(&self, index: usize) -> Result<bool, FbError> {
        let i = self.slot_index(index, "Row::IsNull")?;

        Ok(self.slots[i].is_null())
    }

    pub fn set_null(&mut self, index: usize) -> Result<(), FbError> {
        let i = self.slot_index(index, "Row::SetNull")?;
        let slot = &mut self.slots[i];

        match slot.null.as_mut() {
            Some(null) => **null = -1,
            None => return Err(FbError::logic("Row::SetNull", "This column can't be null.")),
        }
        slot.updated = true;

        Ok(())
    }

    /// Value of a slot, `None` when null.
    ///
    /// Reading a blob column as `String` or `Vec<u8>` loads the whole blob.
    pub fn get<T: FromValue>(&self, index: usize) -> Result<Option<T>, FbError> {
        let i = self.slot_index(index, "Row::Get")?;
        let slot = &self.slots[i];

        if slot.is_null() {
            return Ok(None);
        }

        let native = slot.data.read();
        let value = match (&native, T::KIND) {
            (Native::Blob(id), ValueKind::String) | (Native::Blob(id), ValueKind::Bytes) => {
                let bytes = self.load_blob(*id)?;
                if T::KIND == ValueKind::String {
                    Value::String(self.charset.decode(bytes.as_slice())?)
                } else {
                    Value::Bytes(bytes)
                }
            }
            _ => convert::load(&native, &self.field(i), T::KIND, &self.charset, "Row::Get")?,
        };

        T::from_value(value)
            .map(Some)
            .ok_or_else(|| FbError::logic("Row::Get", "Unexpected converted value"))
    }

    /// Stores a value in a slot, clearing its null indicator.
    ///
    /// A `String` or `Vec<u8>` set on a blob column is saved to a new blob.
    pub fn set<T: IntoValue>(&mut self, index: usize, value: T) -> Result<(), FbError> {
        let i = self.slot_index(index, "Row::Set")?;

        let value = match (self.slots[i].wire, value.into_value()) {
            (WireType::Blob, Value::String(s)) => {
                let bytes = self.charset.encode(s.as_str())?;
                Value::BlobId(self.store_blob(&bytes)?)
            }
            (WireType::Blob, Value::Bytes(bytes)) => Value::BlobId(self.store_blob(&bytes)?),
            (_, value) => value,
        };

        let native = convert::store(value, &self.field(i), &self.charset, "Row::Set")?;

        let slot = &mut self.slots[i];
        slot.data.write(native)?;
        if let Some(null) = slot.null.as_mut() {
            **null = 0;
        }
        slot.updated = true;

        Ok(())
    }

    fn load_blob(&self, id: ibase::ISC_QUAD) -> Result<Vec<u8>, FbError> {
        let ctx = self.context("Row::Get")?;

        let blob = Blob::new(&ctx.db, &ctx.tr);
        blob.set_id(id)?;
        blob.load()
    }

    fn store_blob(&self, bytes: &[u8]) -> Result<ibase::ISC_QUAD, FbError> {
        let ctx = self.context("Row::Set")?;

        let blob = Blob::new(&ctx.db, &ctx.tr);
        blob.save(bytes)?;
        blob.id()
    }

    fn quad(&self, index: usize, wire: WireType, origin: &'static str) -> Result<Option<ibase::ISC_QUAD>, FbError> {
        let i = self.slot_index(index, origin)?;
        let slot = &self.slots[i];

        if slot.wire != wire {
            return err_type_conv(origin, slot.wire.name(), wire.name());
        }
        if slot.is_null() {
            return Ok(None);
        }

        Ok(match slot.data.read() {
            Native::Blob(id) | Native::Array(id) => Some(id),
            _ => None,
        })
    }

    /// Assigns the id of a blob column to `blob`. False when null
    pub fn get_blob(&self, index: usize, blob: &Blob) -> Result<bool, FbError> {
        match self.quad(index, WireType::Blob, "Row::Get")? {
            Some(id) => {
                blob.set_id(id)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn set_blob(&mut self, index: usize, blob: &Blob) -> Result<(), FbError> {
        self.set(index, Value::BlobId(blob.id()?))
    }

    /// Assigns the id of an array column to `array`. False when null
    pub fn get_array(&self, index: usize, array: &Array) -> Result<bool, FbError> {
        match self.quad(index, WireType::Array, "Row::Get")? {
            Some(id) => {
                array.set_id(id)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn set_array(&mut self, index: usize, array: &Array) -> Result<(), FbError> {
        self.set(index, Value::ArrayId(array.stored_id()?))
    }

    /// Index of a column, by name and then by alias, ignoring the case
    pub fn column_num(&self, name: &str) -> Result<usize, FbError> {
        let wanted = truncate_name(name).to_uppercase();
        let count = self.slots.len();

        let vars = &self.xsqlda.vars()[..count];
        vars.iter()
            .position(|var| var.name().to_uppercase() == wanted)
            .or_else(|| {
                vars.iter()
                    .position(|var| var.alias().to_uppercase() == wanted)
            })
            .map(|i| i + 1)
            .ok_or_else(|| FbError::logic("Row::ColumnNum", "Could not find matching column."))
    }

    pub fn column_name(&self, index: usize) -> Result<String, FbError> {
        let i = self.slot_index(index, "Row::ColumnName")?;
        Ok(self.var(i).name())
    }

    pub fn column_alias(&self, index: usize) -> Result<String, FbError> {
        let i = self.slot_index(index, "Row::ColumnAlias")?;
        Ok(self.var(i).alias())
    }

    pub fn column_table(&self, index: usize) -> Result<String, FbError> {
        let i = self.slot_index(index, "Row::ColumnTable")?;
        Ok(self.var(i).relation())
    }

    pub fn column_type(&self, index: usize) -> Result<SqlDataType, FbError> {
        let i = self.slot_index(index, "Row::ColumnType")?;
        Ok(self.slots[i].wire.into())
    }

    pub fn column_subtype(&self, index: usize) -> Result<i16, FbError> {
        let i = self.slot_index(index, "Row::ColumnSubtype")?;
        Ok(self.var(i).sqlsubtype)
    }

    /// Byte length of the column
    pub fn column_size(&self, index: usize) -> Result<usize, FbError> {
        let i = self.slot_index(index, "Row::ColumnSize")?;
        Ok(self.var(i).sqllen.max(0) as usize)
    }

    /// Decimal digits of a fixed point column
    pub fn column_scale(&self, index: usize) -> Result<i32, FbError> {
        let i = self.slot_index(index, "Row::ColumnScale")?;
        Ok(-(self.var(i).sqlscale as i32))
    }

    /// Some slot was never set
    pub fn missing_values(&self) -> bool {
        self.slots.iter().any(|s| !s.updated)
    }

    pub fn updated(&self, index: usize) -> Result<bool, FbError> {
        let i = self.slot_index(index, "Row::Updated")?;
        Ok(self.slots[i].updated)
    }

    pub fn any_updated(&self) -> bool {
        self.slots.iter().any(|s| s.updated)
    }

    pub fn charset(&self) -> &Charset {
        &self.charset
    }
}

impl std::fmt::Debug for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Row")
            .field("xsqlda", &self.xsqlda)
            .field("slots", &self.slots)
            .finish()
    }
}

/// Names longer than the engine stores can't match
fn truncate_name(name: &str) -> &str {
    if name.len() <= MAX_NAME_LENGTH {
        return name;
    }

    let mut end = MAX_NAME_LENGTH;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}
