use super::compress::Compressor;
use super::error::BlockError;
use super::header::HeaderFormat;
use super::store::BlockStore;
use std::io::BufRead;

/// One contiguous run of source lines owned by a node, uncompressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    pub node: String,
    /// The lines exactly as read, terminators included
    pub data: Vec<u8>,
    /// 1-based line number of the run's header
    pub line: usize,
    pub records: usize,
}

/// Splits a source stream into per-node runs.
///
/// A run starts at every block-start header and extends up to the next one.
/// Bytes are passed through untouched, so concatenating the runs in order
/// gives back the stream.
pub struct BlockSplitter<R> {
    reader: R,
    format: HeaderFormat,
    line_no: usize,
    /// Header of the next run, already consumed from the reader
    pending: Option<(Vec<u8>, usize)>,
    done: bool,
}

impl<R: BufRead> BlockSplitter<R> {
    pub fn new(reader: R, format: HeaderFormat) -> Self {
        Self {
            reader,
            format,
            line_no: 0,
            pending: None,
            done: false,
        }
    }

    fn read_line(&mut self, buf: &mut Vec<u8>) -> Result<usize, BlockError> {
        buf.clear();
        let n = self
            .reader
            .read_until(b'\n', buf)
            .map_err(|e| BlockError::io(format!("read source at line {}", self.line_no + 1), e))?;
        if n > 0 {
            self.line_no += 1;
        }
        Ok(n)
    }

    fn next_block(&mut self) -> Result<Option<RawBlock>, BlockError> {
        let (mut data, start) = match self.pending.take() {
            Some(pending) => pending,
            None => {
                let mut first = Vec::new();
                if self.read_line(&mut first)? == 0 {
                    return Ok(None);
                }
                (first, self.line_no)
            }
        };

        // The run's first line decides the owner, whether or not it is a proper block start
        let node = self.format.parse_node_id(&data, start)?;
        let mut records = usize::from(data.first() == Some(&self.format.prefix));

        let mut line = Vec::new();
        loop {
            if self.read_line(&mut line)? == 0 {
                break;
            }
            if self.format.is_block_start(&line) {
                self.pending = Some((std::mem::take(&mut line), self.line_no));
                break;
            }
            if line.first() == Some(&self.format.prefix) {
                records += 1;
            }
            data.extend_from_slice(&line);
        }

        Ok(Some(RawBlock {
            node,
            data,
            line: start,
            records,
        }))
    }
}

impl<R: BufRead> Iterator for BlockSplitter<R> {
    type Item = Result<RawBlock, BlockError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_block() {
            Ok(Some(block)) => Some(Ok(block)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PartitionStats {
    pub blocks: usize,
    pub records: usize,
    /// Uncompressed bytes read from the source
    pub bytes: usize,
}

/// Turns one source stream into one compressed block per node.
pub struct Partitioner<'a> {
    store: &'a BlockStore,
    compressor: &'a dyn Compressor,
    format: HeaderFormat,
    parallel: usize,
}

impl<'a> Partitioner<'a> {
    pub fn new(store: &'a BlockStore, compressor: &'a dyn Compressor) -> Self {
        Self {
            store,
            compressor,
            format: HeaderFormat::default(),
            parallel: 1,
        }
    }

    pub fn format(mut self, format: HeaderFormat) -> Self {
        self.format = format;
        self
    }

    /// Number of compression workers
    pub fn parallel(mut self, parallel: usize) -> Self {
        self.parallel = parallel.max(1);
        self
    }

    pub fn partition<R: BufRead + Send>(&self, reader: R) -> Result<PartitionStats, BlockError> {
        if !self.compressor.is_concatenable() {
            return Err(BlockError::NotConcatenable {
                compressor: self.compressor.name().to_string(),
            });
        }

        let splitter = BlockSplitter::new(reader, self.format.clone());
        let stats = if self.parallel == 1 {
            self.partition_serial(splitter)?
        } else {
            self.partition_parallel(splitter)?
        };

        log::info!(
            "Cluster {}: {} blocks, {} records, {} bytes",
            self.store.cluster(),
            stats.blocks,
            stats.records,
            stats.bytes
        );
        Ok(stats)
    }

    fn compress(&self, block: &RawBlock) -> Result<Vec<u8>, BlockError> {
        self.compressor
            .compress(&block.data)
            .map_err(|e| BlockError::io(format!("compress block {}", block.node), e))
    }

    fn partition_serial<R: BufRead>(
        &self,
        splitter: BlockSplitter<R>,
    ) -> Result<PartitionStats, BlockError> {
        let mut stats = PartitionStats::default();
        for block in splitter {
            let block = block?;
            let packed = self.compress(&block)?;
            self.store.put(&block.node, &packed)?;
            stats.tally(&block);
        }
        Ok(stats)
    }

    // Reader -> compression workers -> one registering sink.
    // The scan stays sequential; only compression runs concurrently.
    fn partition_parallel<R: BufRead + Send>(
        &self,
        splitter: BlockSplitter<R>,
    ) -> Result<PartitionStats, BlockError> {
        let (snd_raw, rcv_raw) = crossbeam::channel::bounded::<RawBlock>(self.parallel * 2);
        let (snd_packed, rcv_packed) =
            crossbeam::channel::bounded::<Result<(RawBlock, Vec<u8>), BlockError>>(
                self.parallel * 2,
            );

        let result = crossbeam::scope(|s| {
            //----------------------------
            // Reader thread
            //----------------------------
            let reader = s.spawn(move |_| -> Result<(), BlockError> {
                for block in splitter {
                    // A closed channel means the sink gave up; its error wins
                    if snd_raw.send(block?).is_err() {
                        break;
                    }
                }
                Ok(())
            });

            //----------------------------
            // Worker threads
            //----------------------------
            for _ in 0..self.parallel {
                let (sendr, recvr) = (snd_packed.clone(), rcv_raw.clone());
                s.spawn(move |_| {
                    for block in recvr.iter() {
                        let packed = self.compress(&block).map(|p| (block, p));
                        if sendr.send(packed).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(snd_packed);
            drop(rcv_raw);

            //----------------------------
            // Sink
            //----------------------------
            let mut stats = PartitionStats::default();
            let mut failure = None;
            for packed in rcv_packed.iter() {
                match packed.and_then(|(block, bytes)| {
                    self.store.put(&block.node, &bytes).map(|_| block)
                }) {
                    Ok(block) => stats.tally(&block),
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }
            // Unblock the pipeline before joining
            drop(rcv_packed);

            let read = reader.join().unwrap_or_else(|_| {
                Err(BlockError::io(
                    "read source",
                    std::io::Error::new(std::io::ErrorKind::Other, "reader thread panicked"),
                ))
            });
            match (failure, read) {
                (Some(e), _) | (None, Err(e)) => Err(e),
                (None, Ok(())) => Ok(stats),
            }
        });

        result.unwrap_or_else(|_| {
            Err(BlockError::io(
                "partition",
                std::io::Error::new(std::io::ErrorKind::Other, "worker thread panicked"),
            ))
        })
    }
}

impl PartitionStats {
    fn tally(&mut self, block: &RawBlock) {
        self.blocks += 1;
        self.records += block.records;
        self.bytes += block.data.len();
    }
}
